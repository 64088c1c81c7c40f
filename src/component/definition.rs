//! Component definitions - what the resolver hands the VM for a component.

use std::fmt;
use std::rc::Rc;

use serde_json::json;

use super::instance::ComponentFactory;
use super::manager::ComponentManager;
use crate::types::{Capabilities, Specifier};

/// An immutable, resolved component.
///
/// Built once per canonical component name and shared by every placement.
pub struct ComponentDefinition {
    name: String,
    manager: Rc<dyn ComponentManager>,
    factory: Option<Rc<dyn ComponentFactory>>,
    layout: Specifier,
    capabilities: Capabilities,
}

impl ComponentDefinition {
    pub fn new(
        name: impl Into<String>,
        manager: Rc<dyn ComponentManager>,
        factory: Option<Rc<dyn ComponentFactory>>,
        layout: Specifier,
    ) -> Self {
        Self {
            name: name.into(),
            manager,
            factory,
            layout,
            capabilities: Capabilities::STANDARD,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &Rc<dyn ComponentManager> {
        &self.manager
    }

    /// `None` for template-only components.
    pub fn factory(&self) -> Option<&Rc<dyn ComponentFactory>> {
        self.factory.as_ref()
    }

    pub fn layout(&self) -> &Specifier {
        &self.layout
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Debug form shown by inspectors.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "debug": format!("<component-definition name=\"{}\">", self.name) })
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("capabilities", &self.capabilities)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}
