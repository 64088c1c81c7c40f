//! Environment - the runtime context a render pass runs in.
//!
//! Owns the revision clock, the tree backend, the component manager and the
//! compile state (program heap and macros) shared by every template the
//! resolver compiles. It also brackets render passes: hooks scheduled during
//! a pass run when the pass commits.
//!
//! # Example
//!
//! ```ignore
//! let env = Environment::create(EnvironmentOptions {
//!     base_url: Some("https://example.com/app/".into()),
//!     ..Default::default()
//! });
//! let resolver = Rc::new(Resolver::new(Rc::new(registry), env.clock()));
//! env.set_resolver(resolver.clone());
//!
//! env.begin()?;
//! // ... VM renders, scheduling did_create hooks ...
//! env.commit()?;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};
use url::Url;

use crate::compiler::{CompileOptions, Macros, Program};
use crate::component::{ComponentManager, StandardManager};
use crate::error::{Error, Result};
use crate::host::{SimpleDocument, TreeConstruction};
use crate::iterable::{Iterable, KeyStrategy};
use crate::reactive::{ReferenceRef, RevisionClock};
use crate::resolver::Resolver;

// =============================================================================
// Options
// =============================================================================

/// Construction options. Every field has a default.
#[derive(Clone, Default)]
pub struct EnvironmentOptions {
    /// Tree backend. Defaults to [`SimpleDocument`].
    pub document: Option<Rc<dyn TreeConstruction>>,
    /// Base relative URLs are resolved against in
    /// [`Environment::protocol_for_url`].
    pub base_url: Option<String>,
    /// Share a clock with other environments or pre-built state.
    pub clock: Option<RevisionClock>,
}

impl fmt::Debug for EnvironmentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentOptions")
            .field("document", &self.document.is_some())
            .field("base_url", &self.base_url)
            .field("clock", &self.clock)
            .finish()
    }
}

// =============================================================================
// Render pass
// =============================================================================

type Hook = Box<dyn FnOnce()>;

#[derive(Default)]
struct RenderPass {
    created: Vec<Hook>,
    updated: Vec<Hook>,
}

// =============================================================================
// Environment
// =============================================================================

pub struct Environment {
    clock: RevisionClock,
    document: Rc<dyn TreeConstruction>,
    base_url: Option<Url>,
    manager: Rc<dyn ComponentManager>,

    resolver: RefCell<Option<Rc<Resolver>>>,
    program: Rc<Program>,
    macros: Rc<Macros>,
    compile_options: RefCell<Option<CompileOptions>>,

    pass: RefCell<Option<RenderPass>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("clock", &self.clock)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("resolver", &self.resolver.borrow().is_some())
            .field("rendering", &self.is_rendering())
            .finish()
    }
}

impl Environment {
    pub fn create(options: EnvironmentOptions) -> Self {
        let base_url = options.base_url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(base_url = raw, error = %err, "ignoring invalid base URL");
                None
            }
        });

        let macros = Rc::new(Macros::new());
        macros.add_block("component");
        macros.add_inline("component");

        Self {
            clock: options.clock.unwrap_or_default(),
            document: options.document.unwrap_or_else(|| Rc::new(SimpleDocument)),
            base_url,
            manager: Rc::new(StandardManager),
            resolver: RefCell::new(None),
            program: Rc::new(Program::new()),
            macros,
            compile_options: RefCell::new(None),
            pass: RefCell::new(None),
        }
    }

    pub fn clock(&self) -> &RevisionClock {
        &self.clock
    }

    pub fn document(&self) -> &Rc<dyn TreeConstruction> {
        &self.document
    }

    pub fn manager(&self) -> &Rc<dyn ComponentManager> {
        &self.manager
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    pub fn macros(&self) -> &Rc<Macros> {
        &self.macros
    }

    // =========================================================================
    // Resolver wiring
    // =========================================================================

    /// Attach `resolver`: it compiles into this environment's program with
    /// its macros and hands out definitions managed by its manager.
    pub fn set_resolver(&self, resolver: Rc<Resolver>) {
        let options = CompileOptions {
            resolver: Rc::downgrade(&resolver),
            program: self.program.clone(),
            macros: self.macros.clone(),
        };
        resolver.configure(options.clone(), self.manager.clone());
        *self.compile_options.borrow_mut() = Some(options);
        *self.resolver.borrow_mut() = Some(resolver);
    }

    pub fn resolver(&self) -> Option<Rc<Resolver>> {
        self.resolver.borrow().clone()
    }

    pub fn compile_options(&self) -> Option<CompileOptions> {
        self.compile_options.borrow().clone()
    }

    // =========================================================================
    // Host services
    // =========================================================================

    /// Scheme of `url` with its trailing colon (`"https:"`).
    ///
    /// Relative URLs are resolved against the configured base; anything that
    /// still doesn't parse yields `":"`.
    pub fn protocol_for_url(&self, url: &str) -> String {
        let parsed = Url::parse(url).or_else(|err| match &self.base_url {
            Some(base) => base.join(url),
            None => Err(err),
        });
        match parsed {
            Ok(url) => format!("{}:", url.scheme()),
            Err(_) => ":".to_string(),
        }
    }

    /// Keyed iteration over `reference` for `{{#each ref key=key_path}}`.
    pub fn iterable_for(&self, reference: ReferenceRef, key_path: &str) -> Result<Iterable> {
        let strategy = KeyStrategy::from_key_path(key_path)?;
        Ok(Iterable::new(reference, strategy, &self.clock))
    }

    // =========================================================================
    // Render passes
    // =========================================================================

    /// Open a render pass.
    pub fn begin(&self) -> Result<()> {
        let mut pass = self.pass.borrow_mut();
        if pass.is_some() {
            return Err(Error::RenderPassInProgress);
        }
        *pass = Some(RenderPass::default());
        debug!(revision = self.clock.current(), "render pass started");
        Ok(())
    }

    pub fn is_rendering(&self) -> bool {
        self.pass.borrow().is_some()
    }

    /// Run `hook` when the current pass commits, with the post-insert hooks.
    pub fn schedule_did_create(&self, hook: impl FnOnce() + 'static) -> Result<()> {
        let mut pass = self.pass.borrow_mut();
        let pass = pass.as_mut().ok_or(Error::NoRenderPass)?;
        pass.created.push(Box::new(hook));
        Ok(())
    }

    /// Run `hook` when the current pass commits, after every post-insert
    /// hook.
    pub fn schedule_did_update(&self, hook: impl FnOnce() + 'static) -> Result<()> {
        let mut pass = self.pass.borrow_mut();
        let pass = pass.as_mut().ok_or(Error::NoRenderPass)?;
        pass.updated.push(Box::new(hook));
        Ok(())
    }

    /// Close the pass and run its hooks: every post-insert hook in
    /// scheduling order, then every post-update hook.
    pub fn commit(&self) -> Result<()> {
        let pass = self.pass.borrow_mut().take().ok_or(Error::NoRenderPass)?;
        debug!(
            created = pass.created.len(),
            updated = pass.updated.len(),
            "committing render pass"
        );

        // The pass is already closed; a hook may begin the next one.
        for hook in pass.created {
            hook();
        }
        for hook in pass.updated {
            hook();
        }
        Ok(())
    }
}
