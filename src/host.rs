//! Host tree boundary - elements, bounds and tree construction.
//!
//! The runtime never mutates the host tree itself; it only hands elements to
//! component instances. [`SimpleDocument`] is an in-memory backend for hosts
//! without a real document (and for tests).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Nodes
// =============================================================================

struct ElementData {
    tag_name: String,
    children: RefCell<Vec<Node>>,
}

/// Handle to an element in the host tree. Cloning shares the element.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

/// A child of an element.
#[derive(Clone)]
pub enum Node {
    Element(Element),
    Text(Rc<str>),
}

impl Element {
    fn new(tag_name: &str) -> Self {
        Self(Rc::new(ElementData {
            tag_name: tag_name.to_string(),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn tag_name(&self) -> &str {
        &self.0.tag_name
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// Serialized children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.0.children.borrow().iter() {
            child.write_html(&mut out);
        }
        out
    }

    /// Serialized element including its own tag.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        Node::Element(self.clone()).write_html(&mut out);
        out
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.tag_name())
    }
}

impl Node {
    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                out.push('<');
                out.push_str(el.tag_name());
                out.push('>');
                out.push_str(&el.inner_html());
                out.push_str("</");
                out.push_str(el.tag_name());
                out.push('>');
            }
        }
    }

    fn is_element(&self, element: &Element) -> bool {
        matches!(self, Node::Element(el) if el.ptr_eq(element))
    }
}

/// The range a component rendered into.
#[derive(Clone, Debug)]
pub struct Bounds {
    pub parent: Element,
    pub first: Option<Element>,
    pub last: Option<Element>,
}

impl Bounds {
    pub fn new(parent: Element) -> Self {
        Self {
            parent,
            first: None,
            last: None,
        }
    }
}

// =============================================================================
// Tree construction
// =============================================================================

/// Document backend used by the environment to build host nodes.
pub trait TreeConstruction {
    fn create_element(&self, tag_name: &str) -> Element;

    fn create_text(&self, text: &str) -> Node {
        Node::Text(Rc::from(text))
    }

    /// Insert `node` into `parent` before `reference`, or append when
    /// `reference` is `None` or not a child of `parent`.
    fn insert_before(&self, parent: &Element, node: Node, reference: Option<&Element>);
}

/// In-memory document.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleDocument;

impl TreeConstruction for SimpleDocument {
    fn create_element(&self, tag_name: &str) -> Element {
        Element::new(tag_name)
    }

    fn insert_before(&self, parent: &Element, node: Node, reference: Option<&Element>) {
        let mut children = parent.0.children.borrow_mut();
        let position = reference.and_then(|r| children.iter().position(|c| c.is_element(r)));
        match position {
            Some(index) => children.insert(index, node),
            None => children.push(node),
        }
    }
}
