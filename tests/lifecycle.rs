//! End-to-end: resolve a component, drive it through its lifecycle, iterate.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use spark_runtime::{
    Arguments, ArgsSnapshot, Artifact, Bounds, CompiledTemplate, Component, ComponentBase,
    ComponentDefinition, ComponentManager, ComponentStateBucket, Destroyable, Destructor,
    DynamicScope, Element, Environment, EnvironmentOptions, Error, Injections, Owner,
    ProgramCompiler, ReferenceRef, Registration, Registry, Resolver, Result,
    SerializedTemplate, Specifier, Tag, TemplateCompiler, TemplateMeta, Tracked,
    UpdatableReference, Value, get_path,
};
use spark_runtime::compiler::CompileOptions;
use tracing_test::traced_test;

type Log = Rc<RefCell<Vec<String>>>;

// =============================================================================
// Fixtures
// =============================================================================

struct Greeting {
    base: ComponentBase,
    clicks: Tracked<i64>,
    log: Log,
}

impl Component for Greeting {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn property(&self, key: &str) -> Value {
        match key {
            "clicks" => self.clicks.get().into(),
            _ => self.base.property(key),
        }
    }

    fn did_insert_element(&self) {
        self.log.borrow_mut().push("hook:didInsertElement".into());
    }

    fn did_update(&self) {
        self.log.borrow_mut().push("hook:didUpdate".into());
    }

    fn will_destroy(&self) {
        self.log.borrow_mut().push("hook:willDestroy".into());
    }
}

/// Records every phase, then delegates.
struct Recording {
    inner: Rc<dyn ComponentManager>,
    log: Log,
}

impl Recording {
    fn record(&self, phase: &str) {
        self.log.borrow_mut().push(phase.to_string());
    }
}

impl ComponentManager for Recording {
    fn create(
        &self,
        env: &Environment,
        definition: &ComponentDefinition,
        args: &Arguments,
    ) -> Option<ComponentStateBucket> {
        self.record("create");
        self.inner.create(env, definition, args)
    }

    fn self_reference(&self, bucket: Option<&ComponentStateBucket>) -> Option<ReferenceRef> {
        self.inner.self_reference(bucket)
    }

    fn did_create_element(&self, bucket: Option<&ComponentStateBucket>, element: &Element) {
        self.record("didCreateElement");
        self.inner.did_create_element(bucket, element);
    }

    fn did_render_layout(&self, bucket: Option<&ComponentStateBucket>, bounds: &Bounds) {
        self.record("didRenderLayout");
        self.inner.did_render_layout(bucket, bounds);
    }

    fn did_create(&self, bucket: Option<&ComponentStateBucket>) {
        self.record("didCreate");
        self.inner.did_create(bucket);
    }

    fn tag(&self, bucket: Option<&ComponentStateBucket>) -> Tag {
        self.inner.tag(bucket)
    }

    fn update(&self, bucket: Option<&ComponentStateBucket>, scope: &DynamicScope) {
        self.record("update");
        self.inner.update(bucket, scope);
    }

    fn did_update_layout(&self, bucket: Option<&ComponentStateBucket>, bounds: &Bounds) {
        self.record("didUpdateLayout");
        self.inner.did_update_layout(bucket, bounds);
    }

    fn did_update(&self, bucket: Option<&ComponentStateBucket>) {
        self.record("didUpdate");
        self.inner.did_update(bucket);
    }

    fn destructor(&self, bucket: Option<&ComponentStateBucket>) -> Option<Destructor> {
        self.inner.destructor(bucket)
    }
}

/// Counts compilations, then compiles normally.
#[derive(Default)]
struct CountingCompiler {
    compiles: Cell<usize>,
}

impl TemplateCompiler for CountingCompiler {
    fn compile(
        &self,
        template: &Rc<SerializedTemplate>,
        options: &CompileOptions,
    ) -> Result<CompiledTemplate> {
        self.compiles.set(self.compiles.get() + 1);
        ProgramCompiler.compile(template, options)
    }
}

/// Counts every call into the naming authority.
struct CountingOwner {
    inner: Registry,
    calls: Cell<usize>,
}

impl Owner for CountingOwner {
    fn identify(&self, key: &str, referrer: Option<&str>) -> Option<String> {
        self.calls.set(self.calls.get() + 1);
        self.inner.identify(key, referrer)
    }

    fn lookup(&self, key: &str) -> Option<Registration> {
        self.calls.set(self.calls.get() + 1);
        self.inner.lookup(key)
    }
}

fn greeting_registry(log: &Log) -> Registry {
    let registry = Registry::new();
    registry.register_template("Greeting", "<p>Hello {{@name}} ({{this.clicks}})</p>");
    let log = log.clone();
    registry.register_component("Greeting", move |injections: Injections| -> Rc<dyn Component> {
        let clock = injections.clock.clone();
        Rc::new(Greeting {
            base: ComponentBase::new(injections),
            clicks: Tracked::new(&clock, "clicks", 0),
            log: log.clone(),
        })
    });
    registry
}

fn environment() -> Environment {
    Environment::create(EnvironmentOptions::default())
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_phases_run_in_order_and_destroy_once() {
    let log: Log = Rc::default();
    let env = environment();
    let resolver = Rc::new(Resolver::new(Rc::new(greeting_registry(&log)), env.clock()));
    env.set_resolver(resolver.clone());

    let specifier = resolver
        .lookup_component("Greeting", &TemplateMeta::default())
        .unwrap()
        .unwrap();
    let Some(Artifact::Component(definition)) = resolver.resolve(&specifier) else {
        panic!("Greeting did not resolve to a component");
    };

    let manager = Recording {
        inner: definition.manager().clone(),
        log: log.clone(),
    };
    let name = Rc::new(UpdatableReference::new(env.clock(), "Ada"));
    let args = Arguments::new().named_arg("name", name.clone());
    let element = env.document().create_element("p");
    let bounds = Bounds::new(env.document().create_element("section"));

    // First render
    env.begin().unwrap();
    assert!(manager.prepare_args(&definition, &args).is_none());
    let bucket = Rc::new(manager.create(&env, &definition, &args).unwrap());
    manager.did_create_element(Some(&*bucket), &element);
    manager.did_render_layout(Some(&*bucket), &bounds);
    {
        let bucket = bucket.clone();
        let manager = Recording {
            inner: definition.manager().clone(),
            log: log.clone(),
        };
        env.schedule_did_create(move || manager.did_create(Some(&*bucket)))
            .unwrap();
    }
    env.commit().unwrap();

    let this = manager.self_reference(Some(&*bucket)).unwrap();
    let shown_name = get_path(&get_path(&this, "args"), "name");
    assert_eq!(shown_name.value(), Value::from("Ada"));
    let rendered_at = env.clock().current();

    // Argument changes, re-render
    name.update("Grace");
    manager.update(Some(&*bucket), &DynamicScope::new());
    manager.did_update_layout(Some(&*bucket), &bounds);
    manager.did_update(Some(&*bucket));

    assert!(!shown_name.tag().validate(rendered_at));
    assert_eq!(shown_name.value(), Value::from("Grace"));

    let phases: Vec<String> = log
        .borrow()
        .iter()
        .filter(|entry| !entry.starts_with("hook:"))
        .cloned()
        .collect();
    assert_eq!(
        phases,
        [
            "create",
            "didCreateElement",
            "didRenderLayout",
            "didCreate",
            "update",
            "didUpdateLayout",
            "didUpdate",
        ]
    );

    // Teardown
    let destructor = manager.destructor(Some(&*bucket)).unwrap();
    destructor.destroy();
    destructor.destroy();

    let entries = log.borrow();
    let hooks: Vec<&str> = entries
        .iter()
        .filter_map(|entry| entry.strip_prefix("hook:"))
        .collect();
    assert_eq!(hooks, ["didInsertElement", "didUpdate", "willDestroy"]);

    let instance = bucket.component();
    assert!(instance.base().is_destroyed());
    assert!(instance.base().element().unwrap().ptr_eq(&element));
}

#[test]
fn test_self_reference_reads_instance_properties() {
    let log: Log = Rc::default();
    let env = environment();
    let resolver = Rc::new(Resolver::new(Rc::new(greeting_registry(&log)), env.clock()));
    env.set_resolver(resolver.clone());
    resolver
        .lookup_component("Greeting", &TemplateMeta::default())
        .unwrap();
    let definition = resolver.component_definition("Greeting").unwrap();

    let bucket = env
        .manager()
        .create(&env, &definition, &Arguments::new())
        .unwrap();
    assert_eq!(bucket.name(), "Greeting");
    assert!(env.manager().tag(Some(&bucket)).is_const());

    let this = env.manager().self_reference(Some(&bucket)).unwrap();
    assert_eq!(get_path(&this, "clicks").value(), Value::from(0));
    assert_eq!(get_path(&this, "debugName").value(), Value::from("Greeting"));
    let destroyed = get_path(&this, "isDestroyed");
    assert_eq!(destroyed.value(), Value::Bool(false));
    let before_destroy = env.clock().current();

    env.manager().destructor(Some(&bucket)).unwrap().destroy();
    assert!(bucket.component().base().is_destroyed());
    assert!(!destroyed.tag().validate(before_destroy));
    assert_eq!(destroyed.value(), Value::Bool(true));
}

// =============================================================================
// Resolution caching
// =============================================================================

#[test]
fn test_component_compiles_once() {
    let log: Log = Rc::default();
    let env = environment();
    let compiler = Rc::new(CountingCompiler::default());
    let resolver = Rc::new(
        Resolver::new(Rc::new(greeting_registry(&log)), env.clock()).with_compiler(compiler.clone()),
    );
    env.set_resolver(resolver.clone());
    let meta = TemplateMeta::default();

    let a = resolver.lookup_component("Greeting", &meta).unwrap().unwrap();
    let b = resolver.lookup_component("Greeting", &meta).unwrap().unwrap();
    resolver.build_component_definition("Greeting", &meta).unwrap();

    assert_eq!(a, b);
    assert_eq!(compiler.compiles.get(), 1);

    let (Some(Artifact::Component(first)), Some(Artifact::Component(second))) =
        (resolver.resolve(&a), resolver.resolve(&b))
    else {
        panic!("expected component definitions");
    };
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(
        first.to_json(),
        json!({ "debug": "<component-definition name=\"Greeting\">" })
    );
}

#[test]
fn test_builtin_helper_skips_owner() {
    let env = environment();
    let owner = Rc::new(CountingOwner {
        inner: Registry::new(),
        calls: Cell::new(0),
    });
    let resolver = Rc::new(Resolver::new(owner.clone(), env.clock()));
    env.set_resolver(resolver.clone());

    let specifier = resolver
        .lookup_helper("action", &TemplateMeta::default())
        .unwrap();
    assert_eq!(specifier, Specifier::parse("helper:action").unwrap());
    assert!(matches!(resolver.resolve(&specifier), Some(Artifact::Helper(_))));
    assert_eq!(owner.calls.get(), 0);

    // Unknown helpers do ask
    assert!(resolver
        .lookup_helper("format", &TemplateMeta::default())
        .is_none());
    assert!(owner.calls.get() > 0);
}

#[test]
fn test_missing_template_names_the_component() {
    let log: Log = Rc::default();
    let env = environment();
    let registry = greeting_registry(&log);
    registry.register_component("Widget", |injections: Injections| -> Rc<dyn Component> {
        Rc::new(Greeting {
            clicks: Tracked::new(&injections.clock, "clicks", 0),
            base: ComponentBase::new(injections),
            log: Rc::default(),
        })
    });
    let resolver = Rc::new(Resolver::new(Rc::new(registry), env.clock()));
    env.set_resolver(resolver.clone());

    let err = resolver
        .build_component_definition("Widget", &TemplateMeta::default())
        .unwrap_err();
    assert!(matches!(&err, Error::MissingTemplate { name } if name == "Widget"));
    assert!(err.to_string().contains("'Widget'"));
}

#[test]
fn test_user_helper_through_resolver() {
    let env = environment();
    let registry = Registry::new();
    registry.register_helper(
        "greet",
        Rc::new(|positional: &[Value], named: &ArgsSnapshot| {
            let name = positional.first().cloned().unwrap_or_default();
            Value::from(format!("{}, {name}!", named.get("salutation")))
        }),
    );
    let resolver = Rc::new(Resolver::new(Rc::new(registry), env.clock()));
    env.set_resolver(resolver.clone());

    resolver
        .lookup_helper("greet", &TemplateMeta::default())
        .unwrap();
    let helper = resolver.helper("greet").unwrap();

    let who = Rc::new(UpdatableReference::new(env.clock(), "Ada"));
    let args = Arguments::new()
        .positional_arg(who.clone())
        .named_arg("salutation", Rc::new(spark_runtime::ConstReference::new("Hi")))
        .capture();
    let greeting = helper(&args).unwrap();
    assert_eq!(greeting.value(), Value::from("Hi, Ada!"));

    who.update("Grace");
    assert_eq!(greeting.value(), Value::from("Hi, Grace!"));
}

// =============================================================================
// Iteration
// =============================================================================

fn keys_for(env: &Environment, list: serde_json::Value, key: &str) -> Vec<Option<String>> {
    let reference: ReferenceRef = Rc::new(spark_runtime::ConstReference::new(list));
    env.iterable_for(reference, key)
        .unwrap()
        .iterate()
        .map(|item| item.key)
        .collect()
}

#[test]
fn test_iteration_keys() {
    let env = environment();
    let some = |keys: &[&str]| keys.iter().map(|k| Some(k.to_string())).collect::<Vec<_>>();

    assert_eq!(keys_for(&env, json!([10, 20, 30]), "@index"), some(&["0", "1", "2"]));
    assert_eq!(keys_for(&env, json!([10, 20, 30]), "@primitive"), some(&["10", "20", "30"]));
    assert_eq!(
        keys_for(&env, json!([{"id": "a"}, {"id": "b"}]), "id"),
        some(&["a", "b"])
    );

    let list: ReferenceRef = Rc::new(spark_runtime::ConstReference::new(json!([1])));
    assert!(matches!(env.iterable_for(list, ""), Err(Error::MissingKeyPath)));
}

#[test]
#[traced_test]
fn test_duplicate_keys_warn() {
    let env = environment();
    let keys = keys_for(&env, json!([{"id": 1}, {"id": 1}]), "id");

    assert_eq!(keys, vec![Some("1".to_string()), Some("1#1".to_string())]);
    assert!(logs_contain("duplicate key in #each"));
}
