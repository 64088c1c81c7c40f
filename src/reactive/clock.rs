//! Revision Clock - the monotonic counter behind every tracked write.
//!
//! A [`RevisionClock`] is a cheap `Rc` handle. Every reactive cell is handed
//! the clock it belongs to at construction time; nothing looks it up through a
//! global. The clock also owns the stack of tracking frames: while a reference
//! computes, each tracked read pushes its [`Tag`] into the innermost frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::tag::Tag;

/// A snapshot of the revision clock.
pub type Revision = u64;

/// Revision of values that never change.
pub const CONSTANT_REVISION: Revision = 0;

/// Revision the clock starts at.
pub const INITIAL_REVISION: Revision = 1;

// =============================================================================
// Clock State
// =============================================================================

struct ClockState {
    current: Cell<Revision>,
    /// One frame per reference currently computing (innermost last).
    frames: RefCell<Vec<Vec<Tag>>>,
    /// Called after every tracked write.
    property_did_change: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Shared handle to a revision clock.
#[derive(Clone)]
pub struct RevisionClock {
    state: Rc<ClockState>,
}

impl Default for RevisionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RevisionClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionClock")
            .field("current", &self.current())
            .field("depth", &self.state.frames.borrow().len())
            .finish()
    }
}

impl RevisionClock {
    /// Create a clock at [`INITIAL_REVISION`].
    pub fn new() -> Self {
        Self {
            state: Rc::new(ClockState {
                current: Cell::new(INITIAL_REVISION),
                frames: RefCell::new(Vec::new()),
                property_did_change: RefCell::new(None),
            }),
        }
    }

    /// Current revision.
    pub fn current(&self) -> Revision {
        self.state.current.get()
    }

    /// Advance the clock and return the new revision.
    pub fn advance(&self) -> Revision {
        let next = self.state.current.get() + 1;
        self.state.current.set(next);
        next
    }

    /// Whether two handles point at the same clock.
    pub fn ptr_eq(&self, other: &RevisionClock) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // =========================================================================
    // Tracking frames
    // =========================================================================

    /// True while some reference is computing.
    pub fn is_tracking(&self) -> bool {
        !self.state.frames.borrow().is_empty()
    }

    /// Register `tag` as a dependency of the innermost computing reference.
    ///
    /// Outside a tracking frame this does nothing.
    pub fn consume(&self, tag: &Tag) {
        if tag.is_const() {
            return;
        }
        if let Some(frame) = self.state.frames.borrow_mut().last_mut() {
            frame.push(tag.clone());
        }
    }

    /// Run `f` inside a fresh tracking frame and return its result together
    /// with the combined tag of everything it read.
    pub fn track<T>(&self, f: impl FnOnce() -> T) -> (T, Tag) {
        self.state.frames.borrow_mut().push(Vec::new());
        let guard = FrameGuard { clock: self };
        let value = f();
        let tags = guard.finish();
        (value, Tag::combine(tags))
    }

    /// Run `f` with dependency registration suspended.
    pub fn untrack<T>(&self, f: impl FnOnce() -> T) -> T {
        let saved = std::mem::take(&mut *self.state.frames.borrow_mut());
        let restore = RestoreGuard { clock: self, saved: Some(saved) };
        let value = f();
        drop(restore);
        value
    }

    // =========================================================================
    // Change notification
    // =========================================================================

    /// Install the callback run after every tracked write.
    ///
    /// Hosts use this to schedule a render pass.
    pub fn set_property_did_change(&self, callback: impl Fn() + 'static) {
        *self.state.property_did_change.borrow_mut() = Some(Rc::new(callback));
    }

    /// Remove the change callback.
    pub fn clear_property_did_change(&self) {
        self.state.property_did_change.borrow_mut().take();
    }

    pub(crate) fn notify_property_did_change(&self) {
        let callback = self.state.property_did_change.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Pops the tracking frame even if the computation unwinds.
struct FrameGuard<'a> {
    clock: &'a RevisionClock,
}

impl FrameGuard<'_> {
    fn finish(self) -> Vec<Tag> {
        let tags = self.clock.state.frames.borrow_mut().pop().unwrap_or_default();
        std::mem::forget(self);
        tags
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.clock.state.frames.borrow_mut().pop();
    }
}

struct RestoreGuard<'a> {
    clock: &'a RevisionClock,
    saved: Option<Vec<Vec<Tag>>>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.clock.state.frames.borrow_mut() = saved;
        }
    }
}
