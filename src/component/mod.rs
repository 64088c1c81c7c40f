//! Components - definitions, instances and the lifecycle manager.
//!
//! ```text
//! Resolver ──builds──▶ ComponentDefinition { name, manager, factory, layout }
//!                               │
//!   VM ──create──▶ ComponentManager ──factory──▶ Rc<dyn Component>
//!                               │                    (owned by the bucket)
//!                               └──▶ ComponentStateBucket ──▶ self_reference / destructor
//! ```

mod args;
mod definition;
mod dynamic;
mod instance;
mod manager;

pub use args::{Arguments, ArgsSnapshot, CapturedArguments, DynamicScope};
pub use definition::ComponentDefinition;
pub use dynamic::{DynamicComponentReference, dynamic_component_for};
pub use instance::{Component, ComponentBase, ComponentFactory, Injections, RootReference};
pub use manager::{
    ComponentManager, ComponentStateBucket, Destroyable, Destructor, StandardManager,
};
