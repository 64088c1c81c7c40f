//! Tracked Property - a value paired with a revision marker.
//!
//! Reads inside a tracking frame register the property's tag with the
//! computing reference. Writes always advance the clock, even when the new
//! value equals the old one: staleness is structural, not value-based.
//!
//! # Example
//!
//! ```
//! use spark_runtime::reactive::{RevisionClock, Tracked};
//!
//! let clock = RevisionClock::new();
//! let title = Tracked::new(&clock, "title", String::from("Hello"));
//!
//! let before = title.revision();
//! title.set(String::from("Hello"));
//! assert!(title.revision() > before);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::clock::{Revision, RevisionClock};
use super::tag::Tag;
use crate::error::{Error, Result};

/// A tracked property.
pub struct Tracked<T> {
    clock: RevisionClock,
    name: String,
    value: RefCell<T>,
    marker: Rc<Cell<Revision>>,
    /// Set when a tracking frame reads the value; cleared by tracked writes.
    consumed: Cell<bool>,
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("name", &self.name)
            .field("value", &self.value.borrow())
            .field("revision", &self.marker.get())
            .finish()
    }
}

impl<T> Tracked<T> {
    /// Create a property on `clock`. `name` shows up in diagnostics.
    pub fn new(clock: &RevisionClock, name: impl Into<String>, value: T) -> Self {
        Self {
            clock: clock.clone(),
            name: name.into(),
            value: RefCell::new(value),
            marker: Rc::new(Cell::new(clock.current())),
            consumed: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Revision of the last tracked write.
    pub fn revision(&self) -> Revision {
        self.marker.get()
    }

    /// Tag following this property's marker.
    pub fn tag(&self) -> Tag {
        Tag::Dirtyable(self.marker.clone())
    }

    fn track_read(&self) {
        if self.clock.is_tracking() {
            self.clock.consume(&self.tag());
            self.consumed.set(true);
        }
    }

    /// Borrow the value, registering a dependency when tracking.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track_read();
        f(&*self.value.borrow())
    }

    /// Replace the value and advance the clock.
    ///
    /// Returns the property's new revision.
    pub fn set(&self, value: T) -> Revision {
        *self.value.borrow_mut() = value;
        self.dirty()
    }

    /// Mutate the value in place through the tracked path.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Revision {
        f(&mut *self.value.borrow_mut());
        self.dirty()
    }

    fn dirty(&self) -> Revision {
        let revision = self.clock.advance();
        self.marker.set(revision);
        self.consumed.set(false);
        self.clock.notify_property_did_change();
        revision
    }

    /// Replace the value without touching the clock.
    ///
    /// Allowed only while no render has consumed the current value; otherwise
    /// the write would leave dependents silently stale and
    /// [`Error::UntrackedMutation`] is returned with the value unchanged.
    pub fn set_untracked(&self, value: T) -> Result<()> {
        if self.consumed.get() {
            return Err(Error::UntrackedMutation {
                property: self.name.clone(),
            });
        }
        *self.value.borrow_mut() = value;
        Ok(())
    }
}

impl<T: Clone> Tracked<T> {
    /// Read the value, registering a dependency when tracking.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Read the value without registering a dependency.
    pub fn peek(&self) -> T {
        self.value.borrow().clone()
    }
}
