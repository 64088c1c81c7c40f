//! Resolver - symbolic names to renderable artifacts.
//!
//! The VM asks for a [`Specifier`] by `(kind, name, referrer)` and later
//! resolves the specifier to the artifact itself. Component definitions,
//! layouts and helpers are built lazily and cached for the resolver's
//! lifetime:
//!
//! ```text
//! lookup_component("UserCard")
//!     ├── cached?  → Specifier
//!     └── build_component_definition
//!           owner.factory_for + owner.lookup(template)
//!           → compiler.compile(options) → Layout + ComponentDefinition (cached)
//! ```
//!
//! A name is compiled at most once. Lookups that find nothing return `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::compiler::{CompileOptions, Layout, ProgramCompiler, TemplateCompiler};
use crate::component::{ComponentDefinition, ComponentManager};
use crate::error::{Error, Result};
use crate::helpers::{Helper, build_user_helper, builtin_helper};
use crate::owner::{Owner, Registration};
use crate::reactive::RevisionClock;
use crate::types::{Specifier, SpecifierKind, TemplateMeta};

// =============================================================================
// Artifacts
// =============================================================================

/// What a specifier resolves to.
#[derive(Clone)]
pub enum Artifact {
    Component(Rc<ComponentDefinition>),
    Layout(Rc<Layout>),
    Helper(Helper),
    /// Modifiers, partials and templates come straight from the owner.
    Registered(Registration),
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(def) => f.debug_tuple("Component").field(def).finish(),
            Self::Layout(layout) => f.debug_tuple("Layout").field(&layout.handle).finish(),
            Self::Helper(_) => f.write_str("Helper"),
            Self::Registered(registration) => {
                f.debug_tuple("Registered").field(registration).finish()
            }
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

pub struct Resolver {
    owner: Rc<dyn Owner>,
    clock: RevisionClock,
    compiler: Rc<dyn TemplateCompiler>,
    options: RefCell<Option<CompileOptions>>,
    manager: RefCell<Option<Rc<dyn ComponentManager>>>,

    component_definitions: RefCell<HashMap<String, Rc<ComponentDefinition>>>,
    layouts: RefCell<HashMap<String, Rc<Layout>>>,
    helpers: RefCell<HashMap<String, Helper>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("configured", &self.options.borrow().is_some())
            .field("components", &self.component_definitions.borrow().len())
            .field("helpers", &self.helpers.borrow().len())
            .finish()
    }
}

impl Resolver {
    /// A resolver over `owner`, compiling with [`ProgramCompiler`].
    ///
    /// Attach it to an environment with
    /// [`Environment::set_resolver`](crate::environment::Environment::set_resolver)
    /// before building component definitions.
    pub fn new(owner: Rc<dyn Owner>, clock: &RevisionClock) -> Self {
        Self {
            owner,
            clock: clock.clone(),
            compiler: Rc::new(ProgramCompiler),
            options: RefCell::new(None),
            manager: RefCell::new(None),
            component_definitions: RefCell::new(HashMap::new()),
            layouts: RefCell::new(HashMap::new()),
            helpers: RefCell::new(HashMap::new()),
        }
    }

    /// Use a different template compiler.
    pub fn with_compiler(mut self, compiler: Rc<dyn TemplateCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub(crate) fn configure(&self, options: CompileOptions, manager: Rc<dyn ComponentManager>) {
        *self.options.borrow_mut() = Some(options);
        *self.manager.borrow_mut() = Some(manager);
    }

    pub fn owner(&self) -> &Rc<dyn Owner> {
        &self.owner
    }

    pub fn is_configured(&self) -> bool {
        self.options.borrow().is_some() && self.manager.borrow().is_some()
    }

    // =========================================================================
    // Generic lookup
    // =========================================================================

    /// Ask the owner to identify `kind:name` as seen from `meta`'s template.
    pub fn lookup(&self, kind: SpecifierKind, name: &str, meta: &TemplateMeta) -> Option<Specifier> {
        let key = format!("{kind}:{name}");
        let identified = self.owner.identify(&key, meta.referrer())?;
        Specifier::parse(&identified)
    }

    /// The artifact behind a specifier.
    ///
    /// Components, layouts and helpers come from the caches filled by the
    /// `lookup_*` methods; every other kind is fetched from the owner.
    pub fn resolve(&self, specifier: &Specifier) -> Option<Artifact> {
        match specifier.kind {
            SpecifierKind::Component => self.component_definition(&specifier.name).map(Artifact::Component),
            SpecifierKind::Layout => self.layout(&specifier.name).map(Artifact::Layout),
            SpecifierKind::Helper => self.helper(&specifier.name).map(Artifact::Helper),
            _ => self.owner.lookup(&specifier.key()).map(Artifact::Registered),
        }
    }

    pub fn lookup_partial(&self, name: &str, meta: &TemplateMeta) -> Option<Specifier> {
        self.lookup(SpecifierKind::Partial, name, meta)
    }

    pub fn lookup_modifier(&self, name: &str, meta: &TemplateMeta) -> Option<Specifier> {
        self.lookup(SpecifierKind::Modifier, name, meta)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Find a helper: cache, then built-ins, then the owner.
    pub fn lookup_helper(&self, name: &str, meta: &TemplateMeta) -> Option<Specifier> {
        let specifier = Specifier::new(SpecifierKind::Helper, name);

        if self.helpers.borrow().contains_key(name) {
            trace!(helper = name, "helper cache hit");
            return Some(specifier);
        }

        if let Some(helper) = builtin_helper(name) {
            self.helpers.borrow_mut().insert(name.to_string(), helper);
            return Some(specifier);
        }

        let key = self.owner.identify(&format!("helper:{name}"), meta.referrer())?;
        match self.owner.lookup(&key)? {
            Registration::Helper(user_helper) => {
                let helper = build_user_helper(user_helper, &self.clock);
                self.helpers.borrow_mut().insert(name.to_string(), helper);
                Some(specifier)
            }
            other => {
                debug!(helper = name, found = other.kind_name(), "not a helper");
                None
            }
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Find a component by the template registered for it, building its
    /// definition on first use.
    pub fn lookup_component(&self, name: &str, meta: &TemplateMeta) -> Result<Option<Specifier>> {
        let Some(identified) = self.owner.identify(&format!("template:{name}"), meta.referrer()) else {
            return Ok(None);
        };
        let expanded = match identified.split_once(':') {
            Some((_, expanded)) => expanded.to_string(),
            None => identified,
        };

        if !self.component_definitions.borrow().contains_key(&expanded) {
            self.build_component_definition(&expanded, meta)?;
        } else {
            trace!(component = expanded.as_str(), "definition cache hit");
        }

        Ok(Some(Specifier::new(SpecifierKind::Component, expanded)))
    }

    /// Compile `name`'s template and cache its layout and definition.
    ///
    /// A name that already has a definition is left alone.
    pub fn build_component_definition(&self, name: &str, meta: &TemplateMeta) -> Result<()> {
        if self.component_definitions.borrow().contains_key(name) {
            return Ok(());
        }

        let referrer = meta.referrer();
        let template_key = self.owner.identify(&format!("template:{name}"), referrer);
        if template_key.is_none()
            && self.owner.identify(&format!("component:{name}"), referrer).is_some()
        {
            return Err(Error::MissingTemplate {
                name: name.to_string(),
            });
        }

        let template = match template_key.and_then(|key| self.owner.lookup(&key)) {
            Some(Registration::Template(template)) => template,
            _ => {
                debug!(component = name, "no template registered");
                return Ok(());
            }
        };

        let options = self.options.borrow().clone().ok_or(Error::ResolverNotConfigured)?;
        let manager = self.manager.borrow().clone().ok_or(Error::ResolverNotConfigured)?;
        let factory = self.owner.factory_for(&format!("component:{name}"));

        // No cache borrow is held here: compilation may call back into the
        // resolver for nested lookups.
        let layout = self.compiler.compile(&template, &options)?.as_layout();
        debug!(component = name, handle = layout.handle.0, "built component definition");

        let layout_specifier = Specifier::new(SpecifierKind::Layout, name);
        let definition = ComponentDefinition::new(name, manager, factory, layout_specifier);

        self.layouts.borrow_mut().insert(name.to_string(), Rc::new(layout));
        self.component_definitions
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| Rc::new(definition));
        Ok(())
    }

    // =========================================================================
    // Cache accessors
    // =========================================================================

    pub fn component_definition(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.component_definitions.borrow().get(name).cloned()
    }

    pub fn layout(&self, name: &str) -> Option<Rc<Layout>> {
        self.layouts.borrow().get(name).cloned()
    }

    pub fn helper(&self, name: &str) -> Option<Helper> {
        self.helpers.borrow().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Handle;
    use crate::component::{Component, ComponentBase, Injections};
    use crate::environment::{Environment, EnvironmentOptions};
    use crate::owner::Registry;
    use crate::component::ArgsSnapshot;
    use crate::value::Value;

    struct Card {
        base: ComponentBase,
    }

    impl Component for Card {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
    }

    fn card(injections: Injections) -> Rc<dyn Component> {
        Rc::new(Card {
            base: ComponentBase::new(injections),
        })
    }

    fn setup(registry: Registry) -> (Environment, Rc<Resolver>) {
        let env = Environment::create(EnvironmentOptions::default());
        let resolver = Rc::new(Resolver::new(Rc::new(registry), env.clock()));
        env.set_resolver(resolver.clone());
        (env, resolver)
    }

    #[test]
    fn test_lookup_component_builds_once() {
        let registry = Registry::new();
        registry.register_template("Card", "<div>{{@title}}</div>");
        registry.register_component("Card", card);
        let (env, resolver) = setup(registry);
        let meta = TemplateMeta::default();

        let first = resolver.lookup_component("Card", &meta).unwrap().unwrap();
        let second = resolver.lookup_component("Card", &meta).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(env.program().len(), 1);

        let a = resolver.component_definition("Card").unwrap();
        let b = resolver.component_definition("Card").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(a.factory().is_some());
        assert!(resolver.layout("Card").is_some());
    }

    #[test]
    fn test_definition_layout_resolves_to_compiled_template() {
        let registry = Registry::new();
        registry.register_template("Card", "<div>{{@title}}</div>");
        registry.register_component("Card", card);
        let (env, resolver) = setup(registry);

        let specifier = resolver
            .lookup_component("Card", &TemplateMeta::default())
            .unwrap()
            .unwrap();
        let Some(Artifact::Component(definition)) = resolver.resolve(&specifier) else {
            panic!("component specifier should resolve to its definition");
        };
        let Some(Artifact::Layout(layout)) = resolver.resolve(definition.layout()) else {
            panic!("definition layout should resolve to the compiled layout");
        };

        assert_eq!(layout.handle, Handle(0));
        let entry = env.program().get(layout.handle).unwrap();
        assert!(Rc::ptr_eq(&entry, &layout.source));
        assert_eq!(env.program().len(), 1);
    }

    #[test]
    fn test_template_only_component() {
        let registry = Registry::new();
        registry.register_template("Banner", "<h1>Hi</h1>");
        let (_env, resolver) = setup(registry);

        let specifier = resolver
            .lookup_component("Banner", &TemplateMeta::default())
            .unwrap()
            .unwrap();
        match resolver.resolve(&specifier) {
            Some(Artifact::Component(def)) => assert!(def.factory().is_none()),
            other => panic!("expected a component, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let registry = Registry::new();
        registry.register_component("Orphan", card);
        let (_env, resolver) = setup(registry);

        let err = resolver
            .build_component_definition("Orphan", &TemplateMeta::default())
            .unwrap_err();
        assert_eq!(err, Error::MissingTemplate { name: "Orphan".into() });
        assert!(err.to_string().contains("'Orphan'"));
    }

    #[test]
    fn test_unknown_component_is_none() {
        let (_env, resolver) = setup(Registry::new());
        assert_eq!(resolver.lookup_component("Nope", &TemplateMeta::default()), Ok(None));
    }

    #[test]
    fn test_unconfigured_resolver() {
        let registry = Registry::new();
        registry.register_template("Card", "");
        let resolver = Resolver::new(Rc::new(registry), &RevisionClock::new());

        let err = resolver
            .lookup_component("Card", &TemplateMeta::default())
            .unwrap_err();
        assert_eq!(err, Error::ResolverNotConfigured);
    }

    #[test]
    fn test_compile_error_leaves_cache_empty() {
        let registry = Registry::new();
        registry.register_template("Broken", "{{oops");
        let (_env, resolver) = setup(registry);

        let err = resolver
            .lookup_component("Broken", &TemplateMeta::default())
            .unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
        assert!(resolver.component_definition("Broken").is_none());
    }

    #[test]
    fn test_user_helper_is_wrapped_and_cached() {
        let registry = Registry::new();
        registry.register_helper(
            "upper",
            Rc::new(|positional: &[Value], _named: &ArgsSnapshot| {
                Value::from(positional[0].to_string().to_uppercase())
            }),
        );
        let (_env, resolver) = setup(registry);
        let meta = TemplateMeta::default();

        let specifier = resolver.lookup_helper("upper", &meta).unwrap();
        assert_eq!(specifier, Specifier::new(SpecifierKind::Helper, "upper"));
        assert!(resolver.helper("upper").is_some());
        assert!(matches!(resolver.resolve(&specifier), Some(Artifact::Helper(_))));

        assert!(resolver.lookup_helper("missing", &meta).is_none());
    }

    #[test]
    fn test_passthrough_kinds() {
        let registry = Registry::new();
        registry.register("modifier:focus", Registration::Other(Rc::new(())));
        let (_env, resolver) = setup(registry);
        let meta = TemplateMeta::default();

        let specifier = resolver.lookup_modifier("focus", &meta).unwrap();
        assert_eq!(specifier.kind, SpecifierKind::Modifier);
        assert!(matches!(resolver.resolve(&specifier), Some(Artifact::Registered(_))));
        assert!(resolver.lookup_partial("focus", &meta).is_none());
    }
}
