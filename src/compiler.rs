//! Template compiler boundary - serialized templates in, program handles out.
//!
//! The opcode encoding belongs to the VM; this module only fixes the shape of
//! the exchange. [`ProgramCompiler`] is the default compiler: it checks the
//! mustache structure, pulls out the expressions and appends the template to
//! the shared [`Program`] heap.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::types::TemplateMeta;

// =============================================================================
// Templates
// =============================================================================

/// A template as registered with the naming authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedTemplate {
    pub id: String,
    pub block: String,
    pub meta: TemplateMeta,
}

/// Position of a compiled template in the [`Program`] heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u32);

/// Output of a [`TemplateCompiler`].
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub handle: Handle,
    pub meta: TemplateMeta,
    pub source: Rc<SerializedTemplate>,
    /// Trimmed contents of every `{{ ... }}` in source order.
    pub expressions: Vec<String>,
}

impl CompiledTemplate {
    /// The template in the form component definitions reference.
    pub fn as_layout(&self) -> Layout {
        Layout {
            handle: self.handle,
            meta: self.meta.clone(),
            source: self.source.clone(),
        }
    }
}

/// A compiled component layout.
#[derive(Debug, Clone)]
pub struct Layout {
    pub handle: Handle,
    pub meta: TemplateMeta,
    pub source: Rc<SerializedTemplate>,
}

// =============================================================================
// Program & macros
// =============================================================================

/// Heap of compiled templates shared by every compilation in an environment.
#[derive(Debug, Default)]
pub struct Program {
    templates: RefCell<Vec<Rc<SerializedTemplate>>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, template: Rc<SerializedTemplate>) -> Handle {
        let mut templates = self.templates.borrow_mut();
        templates.push(template);
        Handle((templates.len() - 1) as u32)
    }

    pub fn get(&self, handle: Handle) -> Option<Rc<SerializedTemplate>> {
        self.templates.borrow().get(handle.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.templates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.borrow().is_empty()
    }
}

/// Block (`{{#name}}`) and inline (`{{name}}`) syntax the compiler expands
/// itself instead of resolving.
#[derive(Debug, Default)]
pub struct Macros {
    blocks: RefCell<HashSet<String>>,
    inlines: RefCell<HashSet<String>>,
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&self, name: impl Into<String>) {
        self.blocks.borrow_mut().insert(name.into());
    }

    pub fn add_inline(&self, name: impl Into<String>) {
        self.inlines.borrow_mut().insert(name.into());
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.borrow().contains(name)
    }

    pub fn has_inline(&self, name: &str) -> bool {
        self.inlines.borrow().contains(name)
    }
}

/// Everything a compilation needs from its environment.
#[derive(Clone)]
pub struct CompileOptions {
    pub resolver: Weak<Resolver>,
    pub program: Rc<Program>,
    pub macros: Rc<Macros>,
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("program", &self.program.len())
            .field("resolver_alive", &(self.resolver.strong_count() > 0))
            .finish()
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Turns serialized templates into program handles.
pub trait TemplateCompiler {
    fn compile(
        &self,
        template: &Rc<SerializedTemplate>,
        options: &CompileOptions,
    ) -> Result<CompiledTemplate>;
}

/// Default compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramCompiler;

impl ProgramCompiler {
    fn expressions(template: &SerializedTemplate) -> Result<Vec<String>> {
        let mut expressions = Vec::new();
        let mut rest = template.block.as_str();

        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| Error::Compile {
                name: template.id.clone(),
                message: "unclosed '{{'".to_string(),
            })?;
            let inner = &after[..close];
            if inner.contains("{{") {
                return Err(Error::Compile {
                    name: template.id.clone(),
                    message: "nested '{{' inside an expression".to_string(),
                });
            }
            expressions.push(inner.trim().to_string());
            rest = &after[close + 2..];
        }

        if rest.contains("}}") {
            return Err(Error::Compile {
                name: template.id.clone(),
                message: "unexpected '}}'".to_string(),
            });
        }
        Ok(expressions)
    }
}

impl TemplateCompiler for ProgramCompiler {
    fn compile(
        &self,
        template: &Rc<SerializedTemplate>,
        options: &CompileOptions,
    ) -> Result<CompiledTemplate> {
        let expressions = Self::expressions(template)?;
        let handle = options.program.add(template.clone());
        debug!(
            template = template.id.as_str(),
            handle = handle.0,
            expressions = expressions.len(),
            "compiled template"
        );
        Ok(CompiledTemplate {
            handle,
            meta: template.meta.clone(),
            source: template.clone(),
            expressions,
        })
    }
}
