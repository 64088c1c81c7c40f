//! Reactive tracking - revision clock, tags, tracked properties, references.
//!
//! ```text
//! RevisionClock ──advance──▶ Tracked::set ──marker──▶ Tag ──validate──▶ re-render?
//!       └──frames──▶ CachedReference::value collects every Tracked read
//! ```
//!
//! Staleness is detected by comparing revisions, never by comparing values.

mod clock;
mod reference;
mod tag;
mod tracked;

pub use clock::{CONSTANT_REVISION, INITIAL_REVISION, Revision, RevisionClock};
pub use reference::{
    CachedReference, ConstReference, PropertyReference, Reference, ReferenceRef,
    UpdatableReference, debug_info_for_reference, get_path,
};
pub use tag::Tag;
pub use tracked::Tracked;
