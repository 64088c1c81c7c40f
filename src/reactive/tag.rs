//! Tags - aggregated revision markers.
//!
//! A tag answers one question: "what is the newest revision among the things
//! I depend on?". Validation compares that answer against a snapshot taken
//! when a value was last computed; a dependency newer than the snapshot means
//! the value is stale. Aggregation is `max`, never a sum or count.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::clock::{CONSTANT_REVISION, Revision};

/// A revision tag.
#[derive(Clone, Debug, Default)]
pub enum Tag {
    /// Never changes; always valid.
    #[default]
    Constant,
    /// Always stale. Used for values that were never computed.
    Volatile,
    /// The live marker of a single tracked property.
    Dirtyable(Rc<Cell<Revision>>),
    /// Newest of several tags.
    Combinator(Rc<[Tag]>),
    /// A slot whose inner tag is replaced each time its owner recomputes.
    Updatable(Rc<RefCell<Tag>>),
}

impl Tag {
    /// Combine tags, dropping constants.
    pub fn combine(tags: impl IntoIterator<Item = Tag>) -> Tag {
        let mut tags: Vec<Tag> = tags.into_iter().filter(|t| !t.is_const()).collect();
        match tags.len() {
            0 => Tag::Constant,
            1 => tags.pop().unwrap_or_default(),
            _ => Tag::Combinator(tags.into()),
        }
    }

    /// A fresh updatable slot holding `inner`.
    pub fn updatable(inner: Tag) -> Tag {
        Tag::Updatable(Rc::new(RefCell::new(inner)))
    }

    /// Current revision of this tag.
    pub fn value(&self) -> Revision {
        match self {
            Tag::Constant => CONSTANT_REVISION,
            Tag::Volatile => Revision::MAX,
            Tag::Dirtyable(marker) => marker.get(),
            Tag::Combinator(tags) => tags.iter().map(Tag::value).max().unwrap_or(CONSTANT_REVISION),
            Tag::Updatable(inner) => inner.borrow().value(),
        }
    }

    /// True if nothing this tag depends on is newer than `snapshot`.
    pub fn validate(&self, snapshot: Revision) -> bool {
        match self {
            Tag::Constant => true,
            Tag::Volatile => false,
            _ => self.value() <= snapshot,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Tag::Constant)
    }

    /// Replace the inner tag of an updatable slot. Other variants are left
    /// untouched.
    pub fn update(&self, inner: Tag) {
        if let Tag::Updatable(slot) = self {
            *slot.borrow_mut() = inner;
        }
    }
}
