//! References - pull-based, revision-tagged accessors.
//!
//! A reference exposes `value()` and a [`Tag`]. Consumers snapshot the clock
//! when they read and later ask the tag whether anything newer happened;
//! nothing is pushed. [`CachedReference`] auto-tracks: every tracked property
//! it reads while computing becomes part of its tag.
//!
//! ```text
//! Tracked ──read──▶ CachedReference ──get_path──▶ PropertyReference
//!    │                    │
//!    └──marker──────────▶ tag = max(markers)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::clock::{Revision, RevisionClock};
use super::tag::Tag;
use super::tracked::Tracked;
use crate::value::Value;

// =============================================================================
// Reference trait
// =============================================================================

/// A pull-based, revision-tagged value.
pub trait Reference {
    /// Current value.
    fn value(&self) -> Value;

    /// Tag covering everything `value()` depends on.
    fn tag(&self) -> Tag;

    /// A specialised child reference for `key`, if this reference has one.
    ///
    /// Returning `None` makes [`get_path`] fall back to a plain
    /// [`PropertyReference`].
    fn child(&self, _key: &str) -> Option<ReferenceRef> {
        None
    }

    /// Template path of this reference (e.g. `this.user.name`), for
    /// diagnostics.
    fn debug_path(&self) -> Option<String> {
        None
    }
}

/// Shared reference handle.
pub type ReferenceRef = Rc<dyn Reference>;

/// Reference to `reference.key`.
pub fn get_path(reference: &ReferenceRef, key: &str) -> ReferenceRef {
    match reference.child(key) {
        Some(child) => child,
        None => Rc::new(PropertyReference::new(reference.clone(), key)),
    }
}

/// Human-readable description of a reference for error messages.
pub fn debug_info_for_reference(reference: &dyn Reference) -> String {
    reference.debug_path().unwrap_or_default()
}

// =============================================================================
// ConstReference
// =============================================================================

/// A reference that never changes.
#[derive(Clone, Debug, Default)]
pub struct ConstReference {
    value: Value,
}

impl ConstReference {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }

    /// Shared reference to `undefined`.
    pub fn undefined() -> ReferenceRef {
        Rc::new(Self::default())
    }
}

impl Reference for ConstReference {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn tag(&self) -> Tag {
        Tag::Constant
    }
}

// =============================================================================
// CachedReference
// =============================================================================

/// A derived value that recomputes only when a dependency moved.
///
/// The cache holds the value and the clock revision at which it was computed.
/// The reference is valid while no dependency marker is newer than that
/// snapshot.
pub struct CachedReference {
    clock: RevisionClock,
    compute: Box<dyn Fn() -> Value>,
    cache: RefCell<Option<(Value, Revision)>>,
    tag: Tag,
    label: Option<String>,
}

impl fmt::Debug for CachedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedReference")
            .field("label", &self.label)
            .field("cache", &self.cache.borrow())
            .finish()
    }
}

impl CachedReference {
    pub fn new(clock: &RevisionClock, compute: impl Fn() -> Value + 'static) -> Self {
        Self {
            clock: clock.clone(),
            compute: Box::new(compute),
            cache: RefCell::new(None),
            tag: Tag::updatable(Tag::Volatile),
            label: None,
        }
    }

    /// Attach a template path used by [`Reference::debug_path`].
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// True if a cached value exists and no dependency moved since.
    pub fn is_valid(&self) -> bool {
        match &*self.cache.borrow() {
            Some((_, snapshot)) => self.tag.validate(*snapshot),
            None => false,
        }
    }

    /// Clock revision of the cached value, if any.
    pub fn snapshot(&self) -> Option<Revision> {
        self.cache.borrow().as_ref().map(|(_, snapshot)| *snapshot)
    }
}

impl Reference for CachedReference {
    fn value(&self) -> Value {
        let cached = if self.is_valid() {
            self.cache.borrow().as_ref().map(|(value, _)| value.clone())
        } else {
            None
        };

        let value = match cached {
            Some(value) => value,
            None => {
                let (value, dependencies) = self.clock.track(|| (self.compute)());
                self.tag.update(dependencies);
                *self.cache.borrow_mut() = Some((value.clone(), self.clock.current()));
                value
            }
        };

        // Bubble our dependencies up to whoever is computing around us.
        self.clock.consume(&self.tag);
        value
    }

    fn tag(&self) -> Tag {
        self.tag.clone()
    }

    fn debug_path(&self) -> Option<String> {
        self.label.clone()
    }
}

// =============================================================================
// PropertyReference
// =============================================================================

/// `parent.key` over an immutable parent value.
///
/// Values are never mutated in place, so the property can only change when
/// the parent does; the tag is the parent's.
pub struct PropertyReference {
    parent: ReferenceRef,
    key: String,
}

impl PropertyReference {
    pub fn new(parent: ReferenceRef, key: impl Into<String>) -> Self {
        Self {
            parent,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Reference for PropertyReference {
    fn value(&self) -> Value {
        self.parent.value().get(&self.key)
    }

    fn tag(&self) -> Tag {
        self.parent.tag()
    }

    fn debug_path(&self) -> Option<String> {
        Some(match self.parent.debug_path() {
            Some(parent) if !parent.is_empty() => format!("{parent}.{}", self.key),
            _ => self.key.clone(),
        })
    }
}

// =============================================================================
// UpdatableReference
// =============================================================================

/// A reference whose value the owner can replace, e.g. one list item.
///
/// Replacing the value is a tracked write, so consumers of the old value see
/// their tag go stale.
pub struct UpdatableReference {
    value: Tracked<Value>,
}

impl UpdatableReference {
    pub fn new(clock: &RevisionClock, value: impl Into<Value>) -> Self {
        Self {
            value: Tracked::new(clock, "item", value.into()),
        }
    }

    /// Replace the value.
    pub fn update(&self, value: impl Into<Value>) -> Revision {
        self.value.set(value.into())
    }

    /// Current value without registering a dependency.
    pub fn peek(&self) -> Value {
        self.value.peek()
    }
}

impl Reference for UpdatableReference {
    fn value(&self) -> Value {
        self.value.get()
    }

    fn tag(&self) -> Tag {
        self.value.tag()
    }
}
