//! Component Lifecycle Manager - drives instances through their phases.
//!
//! Per placement the VM calls, in order:
//!
//! ```text
//! prepare_args → create → did_create_element → did_render_layout → did_create
//!     → [ update → did_update_layout → did_update ]* → destroy
//! ```
//!
//! Every phase accepts an absent bucket (template-only components have none)
//! and does nothing in that case.

use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use super::args::{Arguments, CapturedArguments, DynamicScope};
use super::definition::ComponentDefinition;
use super::instance::{Component, Injections, RootReference, destroy_component};
use crate::environment::Environment;
use crate::host::{Bounds, Element};
use crate::reactive::{ReferenceRef, Tag};
use crate::types::Specifier;

// =============================================================================
// State bucket
// =============================================================================

/// Live record of one component placement.
///
/// The bucket is the only strong owner of the instance; the self reference
/// and the destructor hold weak handles.
pub struct ComponentStateBucket {
    name: String,
    component: Rc<dyn Component>,
    args: CapturedArguments,
}

impl ComponentStateBucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &Rc<dyn Component> {
        &self.component
    }

    pub fn args(&self) -> &CapturedArguments {
        &self.args
    }
}

impl std::fmt::Debug for ComponentStateBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStateBucket")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

// =============================================================================
// Destruction
// =============================================================================

/// Something teardown can release.
pub trait Destroyable {
    fn destroy(&self);
}

/// Tears down one instance. Destroying twice is a no-op.
#[derive(Clone)]
pub struct Destructor {
    component: Weak<dyn Component>,
}

impl Destroyable for Destructor {
    fn destroy(&self) {
        if let Some(component) = self.component.upgrade() {
            if destroy_component(&*component) {
                trace!(component = component.base().debug_name(), "destroyed");
            }
        }
    }
}

// =============================================================================
// Manager trait
// =============================================================================

/// Behaviour the VM drives per component placement.
///
/// Resolver and VM depend only on this trait; each family of components
/// provides its own implementation.
pub trait ComponentManager {
    /// Rewrite arguments before `create`. `None` keeps them as they are.
    fn prepare_args(&self, _definition: &ComponentDefinition, _args: &Arguments) -> Option<Arguments> {
        None
    }

    fn create(
        &self,
        env: &Environment,
        definition: &ComponentDefinition,
        args: &Arguments,
    ) -> Option<ComponentStateBucket>;

    fn layout(&self, definition: &ComponentDefinition) -> Specifier {
        definition.layout().clone()
    }

    fn self_reference(&self, bucket: Option<&ComponentStateBucket>) -> Option<ReferenceRef>;

    fn did_create_element(&self, bucket: Option<&ComponentStateBucket>, element: &Element);

    /// The layout has rendered into `bounds`.
    fn did_render_layout(&self, _bucket: Option<&ComponentStateBucket>, _bounds: &Bounds) {}

    fn did_create(&self, bucket: Option<&ComponentStateBucket>);

    /// Tag the VM checks before calling `update`.
    fn tag(&self, _bucket: Option<&ComponentStateBucket>) -> Tag {
        Tag::Constant
    }

    fn update(&self, bucket: Option<&ComponentStateBucket>, scope: &DynamicScope);

    fn did_update_layout(&self, _bucket: Option<&ComponentStateBucket>, _bounds: &Bounds) {}

    fn did_update(&self, bucket: Option<&ComponentStateBucket>);

    fn destructor(&self, bucket: Option<&ComponentStateBucket>) -> Option<Destructor>;
}

// =============================================================================
// StandardManager
// =============================================================================

/// Manager for factory-backed components.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardManager;

impl ComponentManager for StandardManager {
    fn create(
        &self,
        env: &Environment,
        definition: &ComponentDefinition,
        args: &Arguments,
    ) -> Option<ComponentStateBucket> {
        let factory = definition.factory()?;
        let captured = args.capture();
        let component = factory.create(Injections {
            debug_name: definition.name().to_string(),
            args: captured.named_snapshot(),
            clock: env.clock().clone(),
        });

        trace!(component = definition.name(), "created");
        Some(ComponentStateBucket {
            name: definition.name().to_string(),
            component,
            args: captured,
        })
    }

    fn self_reference(&self, bucket: Option<&ComponentStateBucket>) -> Option<ReferenceRef> {
        let bucket = bucket?;
        let clock = bucket.component.base().clock();
        Some(Rc::new(RootReference::new(&bucket.component, clock)))
    }

    fn did_create_element(&self, bucket: Option<&ComponentStateBucket>, element: &Element) {
        if let Some(bucket) = bucket {
            bucket.component.base().set_element(element.clone());
        }
    }

    fn did_create(&self, bucket: Option<&ComponentStateBucket>) {
        if let Some(bucket) = bucket {
            bucket.component.did_insert_element();
        }
    }

    fn update(&self, bucket: Option<&ComponentStateBucket>, _scope: &DynamicScope) {
        if let Some(bucket) = bucket {
            bucket.component.base().set_args(bucket.args.named_snapshot());
        }
    }

    fn did_update(&self, bucket: Option<&ComponentStateBucket>) {
        match bucket {
            Some(bucket) => bucket.component.did_update(),
            None => warn!("did_update called without a component bucket"),
        }
    }

    fn destructor(&self, bucket: Option<&ComponentStateBucket>) -> Option<Destructor> {
        bucket.map(|bucket| Destructor {
            component: Rc::downgrade(&bucket.component),
        })
    }
}
