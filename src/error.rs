//! Error types for the template runtime.
//!
//! Lookups that find nothing return `None` and never land here. Everything in
//! [`Error`] is fatal for the current render pass, except
//! [`Error::UntrackedMutation`] which is reported to the caller so it can
//! decide how loudly to fail.

use thiserror::Error;

/// Errors raised by the resolver, the reactive system and the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A component is registered but has no template.
    #[error(
        "The component '{name}' is missing a template. All components must have a template. \
         Make sure there is a template registered for the component."
    )]
    MissingTemplate { name: String },

    /// `iterable_for` was called without a key path.
    #[error("Must specify a key for #each")]
    MissingKeyPath,

    /// A tracked value was replaced without going through its tracked setter
    /// after a render had already consumed it.
    #[error(
        "The property '{property}' was changed after being rendered. If you want to change a \
         property used in a template after the component has rendered, write it through its \
         tracked setter."
    )]
    UntrackedMutation { property: String },

    /// A component definition was requested before the resolver was attached
    /// to an environment.
    #[error("The resolver has no compile options; attach it to an environment first")]
    ResolverNotConfigured,

    /// The template compiler rejected a template.
    #[error("Failed to compile template '{name}': {message}")]
    Compile { name: String, message: String },

    /// The `action` helper was given something other than a function.
    #[error(
        "You tried to create an action with the {{{{action}}}} helper, but the first argument \
         ({description}) was {found} instead of a function."
    )]
    ActionNotCallable { description: String, found: String },

    /// `begin` was called while another render pass was still open.
    #[error("A render pass is already in progress")]
    RenderPassInProgress,

    /// `commit` (or hook scheduling) happened outside a render pass.
    #[error("No render pass is in progress")]
    NoRenderPass,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template_names_component() {
        let err = Error::MissingTemplate { name: "UserCard".into() };
        let message = err.to_string();
        assert!(message.contains("'UserCard'"));
        assert!(message.contains("missing a template"));
    }

    #[test]
    fn test_action_message_renders_braces() {
        let err = Error::ActionNotCallable {
            description: "this.save".into(),
            found: "undefined".into(),
        };
        assert_eq!(
            err.to_string(),
            "You tried to create an action with the {{action}} helper, but the first argument \
             (this.save) was undefined instead of a function."
        );
    }
}
