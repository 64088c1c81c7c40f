//! # spark-runtime
//!
//! Runtime glue between a host application and a compiled-template rendering
//! engine.
//!
//! Three pieces do the work:
//!
//! - the [`resolver`] maps names used in templates to components, layouts
//!   and helpers, compiling each template once, on first use
//! - the [`component`] manager drives stateful instances through their
//!   lifecycle phases
//! - the [`reactive`] system tags every value with revisions so the VM can
//!   tell which subtrees are stale
//!
//! ## Architecture
//!
//! ```text
//! VM ──lookup──▶ Resolver ──identify/lookup──▶ Owner (Registry)
//!  │                │
//!  │                └──compile once──▶ TemplateCompiler ──▶ Program
//!  │
//!  ├──create/update/destroy──▶ ComponentManager ──▶ Component instances
//!  │                                                   │ Tracked writes
//!  └──validate(tag, snapshot)◀── References ◀──────────┘ advance RevisionClock
//! ```
//!
//! Everything is single-threaded: handles are `Rc`, state lives in `Cell` and
//! `RefCell`, and nothing here is `Send`.
//!
//! ## Modules
//!
//! - [`types`] - Specifiers, capabilities, template metadata
//! - [`value`] - Dynamic template values
//! - [`reactive`] - Revision clock, tags, tracked properties, references
//! - [`component`] - Definitions, instances, lifecycle manager
//! - [`resolver`] - Name resolution and definition caches
//! - [`iterable`] - Keyed iteration and list reconciliation
//! - [`environment`] - Render context, render passes, host services

pub mod compiler;
pub mod component;
pub mod environment;
pub mod error;
pub mod helpers;
pub mod host;
pub mod iterable;
pub mod owner;
pub mod reactive;
pub mod resolver;
pub mod types;
pub mod value;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};
pub use value::{Callback, Value};

pub use reactive::{
    CachedReference, ConstReference, PropertyReference, Reference, ReferenceRef, Revision,
    RevisionClock, Tag, Tracked, UpdatableReference, get_path,
};

pub use component::{
    Arguments, ArgsSnapshot, CapturedArguments, Component, ComponentBase, ComponentDefinition,
    ComponentFactory, ComponentManager, ComponentStateBucket, Destroyable, Destructor,
    DynamicScope, Injections, StandardManager,
};

pub use compiler::{CompiledTemplate, Layout, ProgramCompiler, SerializedTemplate, TemplateCompiler};
pub use environment::{Environment, EnvironmentOptions};
pub use helpers::{Helper, UserHelper};
pub use host::{Bounds, Element, SimpleDocument, TreeConstruction};
pub use iterable::{Iterable, IterationItem, KeyStrategy, ListChange, ListReconciler};
pub use owner::{Owner, Registration, Registry};
pub use resolver::{Artifact, Resolver};
