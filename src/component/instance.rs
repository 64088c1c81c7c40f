//! Component instances - the behaviour a factory produces.
//!
//! Every instance embeds a [`ComponentBase`] holding the state the manager
//! drives: tracked `args`, the bound element and the destruction flags.
//! Application code implements [`Component`] and overrides the hooks it
//! cares about.
//!
//! ```ignore
//! struct Counter {
//!     base: ComponentBase,
//!     count: Tracked<i64>,
//! }
//!
//! impl Component for Counter {
//!     fn base(&self) -> &ComponentBase { &self.base }
//!
//!     fn property(&self, key: &str) -> Value {
//!         match key {
//!             "count" => self.count.get().into(),
//!             _ => self.base.property(key),
//!         }
//!     }
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::args::ArgsSnapshot;
use crate::host::Element;
use crate::reactive::{CachedReference, Reference, ReferenceRef, RevisionClock, Tag, Tracked};
use crate::value::Value;

// =============================================================================
// Factory
// =============================================================================

/// What a factory receives when the manager creates an instance.
#[derive(Debug, Clone)]
pub struct Injections {
    pub debug_name: String,
    pub args: ArgsSnapshot,
    pub clock: RevisionClock,
}

/// Creates component instances.
pub trait ComponentFactory {
    fn create(&self, injections: Injections) -> Rc<dyn Component>;
}

impl<F> ComponentFactory for F
where
    F: Fn(Injections) -> Rc<dyn Component>,
{
    fn create(&self, injections: Injections) -> Rc<dyn Component> {
        self(injections)
    }
}

// =============================================================================
// Component trait
// =============================================================================

/// A stateful component instance.
///
/// Hooks take `&self`: instances mutate their state through [`Tracked`]
/// properties, which keeps every write visible to the revision clock.
pub trait Component {
    fn base(&self) -> &ComponentBase;

    /// Value of `this.<key>` in the component's template.
    fn property(&self, key: &str) -> Value {
        self.base().property(key)
    }

    /// Called once the component's element is in the tree.
    fn did_insert_element(&self) {}

    /// Called after an update pass re-rendered the component.
    fn did_update(&self) {}

    /// Called once when the component is torn down.
    fn will_destroy(&self) {}
}

/// State every component carries.
pub struct ComponentBase {
    debug_name: String,
    clock: RevisionClock,
    args: Tracked<ArgsSnapshot>,
    element: RefCell<Option<Element>>,
    destroying: Tracked<bool>,
    destroyed: Tracked<bool>,
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("debug_name", &self.debug_name)
            .field("args", &self.args.peek())
            .field("destroyed", &self.destroyed.peek())
            .finish()
    }
}

impl ComponentBase {
    pub fn new(injections: Injections) -> Self {
        Self {
            args: Tracked::new(&injections.clock, "args", injections.args),
            destroying: Tracked::new(&injections.clock, "isDestroying", false),
            destroyed: Tracked::new(&injections.clock, "isDestroyed", false),
            debug_name: injections.debug_name,
            clock: injections.clock,
            element: RefCell::new(None),
        }
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Clock the instance's tracked state belongs to.
    pub fn clock(&self) -> &RevisionClock {
        &self.clock
    }

    /// Current arguments (tracked read).
    pub fn args(&self) -> ArgsSnapshot {
        self.args.get()
    }

    /// Replace the arguments snapshot (tracked write).
    pub fn set_args(&self, args: ArgsSnapshot) {
        self.args.set(args);
    }

    /// Tag of the `args` property.
    pub fn args_tag(&self) -> Tag {
        self.args.tag()
    }

    pub fn element(&self) -> Option<Element> {
        self.element.borrow().clone()
    }

    pub fn set_element(&self, element: Element) {
        *self.element.borrow_mut() = Some(element);
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Properties every component answers. All of them are tracked reads.
    pub fn property(&self, key: &str) -> Value {
        match key {
            "args" => self.args().to_value(),
            "debugName" => Value::from(self.debug_name.as_str()),
            "isDestroying" => Value::Bool(self.is_destroying()),
            "isDestroyed" => Value::Bool(self.is_destroyed()),
            _ => Value::Undefined,
        }
    }
}

/// Run `will_destroy` once. Returns false if the component was already torn
/// down (or is being torn down).
pub(crate) fn destroy_component(component: &dyn Component) -> bool {
    let base = component.base();
    if base.destroying.peek() || base.destroyed.peek() {
        return false;
    }
    base.destroying.set(true);
    component.will_destroy();
    base.destroyed.set(true);
    true
}

// =============================================================================
// RootReference
// =============================================================================

/// `this` inside a component template.
///
/// Holds only a weak handle: the state bucket is the sole owner of the
/// instance. Child references are created once per key and cached.
pub struct RootReference {
    component: Weak<dyn Component>,
    clock: RevisionClock,
    children: RefCell<HashMap<String, ReferenceRef>>,
}

impl RootReference {
    pub fn new(component: &Rc<dyn Component>, clock: &RevisionClock) -> Self {
        Self {
            component: Rc::downgrade(component),
            clock: clock.clone(),
            children: RefCell::new(HashMap::new()),
        }
    }
}

impl Reference for RootReference {
    fn value(&self) -> Value {
        // `this` has no scalar value; templates read through paths
        Value::Undefined
    }

    fn tag(&self) -> Tag {
        Tag::Constant
    }

    fn child(&self, key: &str) -> Option<ReferenceRef> {
        if let Some(existing) = self.children.borrow().get(key) {
            return Some(existing.clone());
        }

        let component = self.component.clone();
        let property = key.to_string();
        let reference: ReferenceRef = Rc::new(
            CachedReference::new(&self.clock, move || {
                component
                    .upgrade()
                    .map(|c| c.property(&property))
                    .unwrap_or_default()
            })
            .with_label(format!("this.{key}")),
        );

        self.children
            .borrow_mut()
            .insert(key.to_string(), reference.clone());
        Some(reference)
    }

    fn debug_path(&self) -> Option<String> {
        Some("this".to_string())
    }
}
