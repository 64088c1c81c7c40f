//! Dynamic components - `{{component this.name}}`.
//!
//! The `component` block and inline macros compile to a
//! [`DynamicComponentReference`]: the first positional argument names the
//! component, and the definition is looked up again whenever that name's tag
//! moves.

use std::rc::Rc;

use super::args::Arguments;
use super::definition::ComponentDefinition;
use crate::environment::Environment;
use crate::error::Result;
use crate::reactive::{ConstReference, ReferenceRef, Tag};
use crate::resolver::{Artifact, Resolver};
use crate::types::TemplateMeta;
use crate::value::Value;

/// Component definition selected by a name reference.
pub struct DynamicComponentReference {
    name_ref: ReferenceRef,
    resolver: Rc<Resolver>,
    meta: TemplateMeta,
}

impl DynamicComponentReference {
    pub fn new(name_ref: ReferenceRef, resolver: Rc<Resolver>, meta: TemplateMeta) -> Self {
        Self {
            name_ref,
            resolver,
            meta,
        }
    }

    /// Follows the name reference.
    pub fn tag(&self) -> Tag {
        self.name_ref.tag()
    }

    /// Definition for the current name.
    ///
    /// Anything that is not a string, or a name with no template, selects no
    /// component.
    pub fn definition(&self) -> Result<Option<Rc<ComponentDefinition>>> {
        let name = match self.name_ref.value() {
            Value::String(name) => name,
            _ => return Ok(None),
        };

        let Some(specifier) = self.resolver.lookup_component(&name, &self.meta)? else {
            return Ok(None);
        };
        Ok(match self.resolver.resolve(&specifier) {
            Some(Artifact::Component(definition)) => Some(definition),
            _ => None,
        })
    }

    /// Paths through a definition are always `undefined`.
    pub fn get(&self, _key: &str) -> ReferenceRef {
        ConstReference::undefined()
    }
}

/// Build the reference for a `component` macro invocation.
///
/// Returns `None` when the environment has no resolver attached.
pub fn dynamic_component_for(
    env: &Environment,
    args: &Arguments,
    meta: &TemplateMeta,
) -> Option<DynamicComponentReference> {
    let name_ref = args
        .positional()
        .first()
        .cloned()
        .unwrap_or_else(ConstReference::undefined);
    let resolver = env.resolver()?;
    Some(DynamicComponentReference::new(name_ref, resolver, meta.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentOptions;
    use crate::owner::Registry;
    use crate::reactive::UpdatableReference;

    fn env_with(registry: Registry) -> Environment {
        let env = Environment::create(EnvironmentOptions::default());
        let resolver = Rc::new(Resolver::new(Rc::new(registry), env.clock()));
        env.set_resolver(resolver);
        env
    }

    #[test]
    fn test_follows_name_reference() {
        let registry = Registry::new();
        registry.register_template("Alpha", "<a></a>");
        registry.register_template("Beta", "<b></b>");
        let env = env_with(registry);

        let name = Rc::new(UpdatableReference::new(env.clock(), "Alpha"));
        let args = Arguments::new().positional_arg(name.clone());
        let dynamic = dynamic_component_for(&env, &args, &TemplateMeta::default()).unwrap();

        assert_eq!(dynamic.definition().unwrap().unwrap().name(), "Alpha");
        let snapshot = env.clock().current();

        name.update("Beta");
        assert!(!dynamic.tag().validate(snapshot));
        assert_eq!(dynamic.definition().unwrap().unwrap().name(), "Beta");
    }

    #[test]
    fn test_non_string_selects_nothing() {
        let env = env_with(Registry::new());
        let args = Arguments::new().positional_arg(Rc::new(ConstReference::new(42)));
        let dynamic = dynamic_component_for(&env, &args, &TemplateMeta::default()).unwrap();

        assert!(dynamic.definition().unwrap().is_none());
        assert!(dynamic.get("anything").value().is_undefined());
    }

    #[test]
    fn test_unknown_name_selects_nothing() {
        let env = env_with(Registry::new());
        let args = Arguments::new().positional_arg(Rc::new(ConstReference::new("Ghost")));
        let dynamic = dynamic_component_for(&env, &args, &TemplateMeta::default()).unwrap();

        assert!(dynamic.definition().unwrap().is_none());
    }
}
