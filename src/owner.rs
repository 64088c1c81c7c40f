//! Naming authority - maps `kind:name` keys to registered artifacts.
//!
//! The resolver never constructs artifacts out of thin air: it asks an
//! [`Owner`] which canonical key a name refers to and what is registered
//! under it. [`Registry`] is the in-memory authority.
//!
//! Lookups are referrer-scoped: from `template:components/user-list`, the
//! name `row` first identifies as `component:user-list/row`, then falls back
//! to `component:row`.
//!
//! ```ignore
//! let registry = Registry::new();
//! registry.register_template("UserCard", "<div>{{@name}}</div>");
//! registry.register_component("UserCard", |inj: Injections| -> Rc<dyn Component> {
//!     Rc::new(UserCard::new(inj))
//! });
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::compiler::SerializedTemplate;
use crate::component::ComponentFactory;
use crate::helpers::UserHelper;
use crate::types::TemplateMeta;

// =============================================================================
// Registrations
// =============================================================================

/// Something registered with the naming authority.
#[derive(Clone)]
pub enum Registration {
    Template(Rc<SerializedTemplate>),
    Component(Rc<dyn ComponentFactory>),
    Helper(UserHelper),
    /// Modifiers, partials and anything else the runtime passes through.
    Other(Rc<dyn Any>),
}

impl Registration {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Template(_) => "template",
            Self::Component(_) => "component",
            Self::Helper(_) => "helper",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(template) => f.debug_tuple("Template").field(&template.id).finish(),
            other => f.write_str(other.kind_name()),
        }
    }
}

/// The naming authority the resolver consults.
pub trait Owner {
    /// Canonical key for `key` (a `kind:name` pair) as seen from `referrer`,
    /// or `None` if nothing answers to it.
    fn identify(&self, key: &str, referrer: Option<&str>) -> Option<String>;

    /// What is registered under a canonical key.
    fn lookup(&self, key: &str) -> Option<Registration>;

    /// Factory registered under a canonical `component:` key.
    fn factory_for(&self, key: &str) -> Option<Rc<dyn ComponentFactory>> {
        match self.lookup(key)? {
            Registration::Component(factory) => Some(factory),
            _ => None,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// In-memory naming authority.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<HashMap<String, Registration>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut keys: Vec<_> = entries.keys().collect();
        keys.sort();
        f.debug_struct("Registry").field("keys", &keys).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under a full `kind:name` key, replacing any previous entry.
    pub fn register(&self, key: impl Into<String>, registration: Registration) {
        self.entries.borrow_mut().insert(key.into(), registration);
    }

    /// Register `source` as `template:<name>`.
    pub fn register_template(&self, name: &str, source: impl Into<String>) {
        let key = format!("template:{name}");
        let template = SerializedTemplate {
            id: key.clone(),
            block: source.into(),
            meta: TemplateMeta::new(key.clone()),
        };
        self.register(key, Registration::Template(Rc::new(template)));
    }

    /// Register a factory as `component:<name>`.
    pub fn register_component(&self, name: &str, factory: impl ComponentFactory + 'static) {
        self.register(
            format!("component:{name}"),
            Registration::Component(Rc::new(factory)),
        );
    }

    /// Register a user helper as `helper:<name>`.
    pub fn register_helper(&self, name: &str, helper: UserHelper) {
        self.register(format!("helper:{name}"), Registration::Helper(helper));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Local scope of a referrer: `template:components/user-list` → `user-list`.
    fn scope_of(referrer: &str) -> Option<&str> {
        let (_, path) = referrer.split_once(':')?;
        let scope = path.rsplit('/').next()?;
        (!scope.is_empty()).then_some(scope)
    }
}

impl Owner for Registry {
    fn identify(&self, key: &str, referrer: Option<&str>) -> Option<String> {
        let entries = self.entries.borrow();

        if let (Some(referrer), Some((kind, name))) = (referrer, key.split_once(':')) {
            if let Some(scope) = Self::scope_of(referrer) {
                let local = format!("{kind}:{scope}/{name}");
                if entries.contains_key(&local) {
                    trace!(key, local = local.as_str(), "identified local");
                    return Some(local);
                }
            }
        }

        entries.contains_key(key).then(|| key.to_string())
    }

    fn lookup(&self, key: &str) -> Option<Registration> {
        self.entries.borrow().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentBase, Injections};

    struct Blank {
        base: ComponentBase,
    }

    impl Component for Blank {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
    }

    fn blank(injections: Injections) -> Rc<dyn Component> {
        Rc::new(Blank {
            base: ComponentBase::new(injections),
        })
    }

    #[test]
    fn test_identify_exact_key() {
        let registry = Registry::new();
        registry.register_template("UserCard", "<div></div>");

        assert_eq!(
            registry.identify("template:UserCard", None).as_deref(),
            Some("template:UserCard")
        );
        assert!(registry.identify("template:Missing", None).is_none());
    }

    #[test]
    fn test_identify_prefers_referrer_scope() {
        let registry = Registry::new();
        registry.register_template("row", "<tr></tr>");
        registry.register_template("user-list/row", "<tr class=user></tr>");

        let from_list = registry.identify("template:row", Some("template:components/user-list"));
        assert_eq!(from_list.as_deref(), Some("template:user-list/row"));

        let from_elsewhere = registry.identify("template:row", Some("template:components/sidebar"));
        assert_eq!(from_elsewhere.as_deref(), Some("template:row"));
    }

    #[test]
    fn test_factory_for_only_returns_components() {
        let registry = Registry::new();
        registry.register_component("Blank", blank);
        registry.register_template("Blank", "");

        assert!(registry.factory_for("component:Blank").is_some());
        assert!(registry.factory_for("template:Blank").is_none());
        assert!(registry.factory_for("component:Other").is_none());
    }

    #[test]
    fn test_lookup_returns_registration() {
        let registry = Registry::new();
        registry.register("modifier:focus", Registration::Other(Rc::new("focus")));

        match registry.lookup("modifier:focus") {
            Some(Registration::Other(value)) => {
                assert_eq!(value.downcast_ref::<&str>(), Some(&"focus"));
            }
            other => panic!("unexpected registration: {other:?}"),
        }
    }
}
