//! Hook system.
//!
//! Hooks intercept the stages of a command invocation:
//!
//! | Stage | Kinds | Handler |
//! |---|---|---|
//! | command event | `pre-command-event`, `command-event`, `post-command-event` | [`CommandEventHook`] |
//! | initialize | `pre-initialize`, `initialize`, `post-initialize` | [`InitializeHook`] |
//! | interact | `pre-interact`, `interact`, `post-interact` | [`InteractHook`] |
//! | option | `pre-option`, `option`, `post-option` | [`OptionHook`] |
//! | validate | `pre-validate`, `validate`, `post-validate` | [`Validator`] |
//! | process | `pre-process`, `process`, `post-process` | [`ResultProcessor`] |
//! | alter | `pre-alter`, `alter`, `post-alter`, `post-command` | [`ResultProcessor`] |
//! | status | `status` | [`StatusDeterminer`] |
//! | extract | `extract` | [`OutputExtractor`] |
//! | replace command | `replace-command` | [`CommandCallback`](crate::CommandCallback) |
//!
//! Handlers are registered in a [`HookManager`] under a scope (command name,
//! alias, command-file identity, or `*`) and dispatched per invocation by a
//! [`HookDispatcher`].
//!
//! ```
//! use annotated_command::{CommandResult, Hook, HookKind, HookManager};
//!
//! let mut hooks = HookManager::new();
//! hooks.add(
//!     Hook::alter(|result, _| {
//!         let text = result.as_text().unwrap_or_default();
//!         Ok(Some(CommandResult::text(format!("<{}>", text))))
//!     }),
//!     HookKind::Alter,
//!     "test:hook",
//! );
//! assert_eq!(hooks.len(), 1);
//! ```

mod dispatch;
mod handlers;
mod kind;
mod registry;

pub use dispatch::HookDispatcher;
pub use handlers::{
    CommandEventHook, Hook, InitializeHook, InteractHook, OptionHook, OutputExtractor,
    ResultProcessor, StatusDeterminer, Validator,
};
pub use kind::{HookKind, HookPhase, HookStage, UnknownHookKind};
pub use registry::{HookManager, WILDCARD};

use thiserror::Error;

use crate::metadata::MetadataError;

/// Errors raised while registering command files and their hooks.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid hook annotation on '{method}': {source}")]
    InvalidHookKind {
        method: String,
        #[source]
        source: UnknownHookKind,
    },

    #[error("hook '{method}' is declared as '{kind}' but its handler is a {handler} hook")]
    HandlerMismatch {
        method: String,
        kind: HookKind,
        handler: &'static str,
    },

    #[error("hook method '{0}' has no hook annotation")]
    MissingHookAnnotation(String),

    #[error("command '{name}' is defined by both '{first}' and '{second}'")]
    DuplicateCommand {
        name: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Where a hook method attaches, parsed from its `hook` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTarget {
    pub kind: HookKind,
    pub scope: String,
}

impl HookTarget {
    /// Parses `"<kind> <scope>"`.
    ///
    /// The kind defaults to `alter` and the scope to `own_name`, the hook
    /// method's own command name.
    ///
    /// ```
    /// use annotated_command::{HookKind, HookTarget};
    ///
    /// let target = HookTarget::parse("alter test:hook", "hook_test").unwrap();
    /// assert_eq!(target.kind, HookKind::Alter);
    /// assert_eq!(target.scope, "test:hook");
    ///
    /// let target = HookTarget::parse("", "test:hook").unwrap();
    /// assert_eq!(target.kind, HookKind::Alter);
    /// assert_eq!(target.scope, "test:hook");
    /// ```
    pub fn parse(annotation: &str, own_name: &str) -> Result<Self, UnknownHookKind> {
        let mut words = annotation.split_whitespace();
        let kind = match words.next() {
            Some(word) => word.parse()?,
            None => HookKind::Alter,
        };
        let scope = words.next().unwrap_or(own_name).to_string();
        Ok(Self { kind, scope })
    }
}
