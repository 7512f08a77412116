//! Typed dispatch over resolved hooks.
//!
//! A [`HookDispatcher`] is created per invocation for one command's scopes.
//! Each method resolves one stage from the registry and calls the handlers
//! with that stage's contract. A handler whose variant cannot serve the
//! stage is skipped with a warning.

use std::rc::Rc;

use super::handlers::Hook;
use super::kind::HookStage;
use super::registry::HookManager;
use crate::annotation::AnnotationData;
use crate::input::{CommandCallback, CommandData, CommandInput};
use crate::metadata::{CommandMetadata, OptionDef};
use crate::output::OutputSink;
use crate::result::{CommandError, CommandResult};

/// Dispatches hook stages for one command.
#[derive(Debug, Clone, Copy)]
pub struct HookDispatcher<'r> {
    manager: &'r HookManager,
    names: &'r [String],
}

impl<'r> HookDispatcher<'r> {
    /// `names` are the command's scopes in priority order: its name, its
    /// aliases, then its command-file identity.
    pub fn new(manager: &'r HookManager, names: &'r [String]) -> Self {
        Self { manager, names }
    }

    pub fn names(&self) -> &[String] {
        self.names
    }

    fn resolve(&self, stage: HookStage) -> Vec<Hook> {
        let hooks = self.manager.get(self.names, stage);
        hooks
            .into_iter()
            .filter(|hook| {
                let fits = hook.serves(stage);
                if !fits {
                    tracing::warn!(
                        %stage,
                        handler = hook.variant_name(),
                        "skipping hook that cannot serve this stage"
                    );
                }
                fits
            })
            .collect()
    }

    /// Runs command-event hooks. The first error stops the chain.
    pub fn command_event(
        &self,
        input: &CommandInput,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        for hook in self.resolve(HookStage::CommandEvent) {
            if let Hook::CommandEvent(handler) = hook {
                handler.on_command_event(input, annotations)?;
            }
        }
        Ok(())
    }

    pub fn initialize(
        &self,
        input: &mut CommandInput,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        for hook in self.resolve(HookStage::Initialize) {
            if let Hook::Initialize(handler) = hook {
                handler.initialize(input, annotations)?;
            }
        }
        Ok(())
    }

    pub fn interact(
        &self,
        input: &mut CommandInput,
        output: &mut dyn OutputSink,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        for hook in self.resolve(HookStage::Interact) {
            if let Hook::Interact(handler) = hook {
                handler.interact(input, output, annotations)?;
            }
        }
        Ok(())
    }

    /// Collects the options every option hook contributes to `command`.
    pub fn options(&self, command: &CommandMetadata) -> Vec<OptionDef> {
        let mut options = Vec::new();
        for hook in self.resolve(HookStage::Option) {
            if let Hook::Options(handler) = hook {
                options.extend(handler.options(command));
            }
        }
        options
    }

    /// Runs validators against `data`.
    ///
    /// A validator that returns a replacement call list updates `data` for
    /// the validators after it and for the command. The first failing
    /// validator stops the chain; its error is returned as an error-result.
    pub fn validate(&self, data: &mut CommandData) -> Option<CommandResult> {
        for hook in self.resolve(HookStage::Validate) {
            let Hook::Validate(validator) = hook else {
                continue;
            };
            match validator.validate(data) {
                Ok(Some(args)) => {
                    tracing::trace!(?args, "validator replaced the call list");
                    data.replace_args(args);
                }
                Ok(None) => {}
                Err(err) => {
                    let error = CommandError::from_error(&err);
                    tracing::debug!(code = error.code, message = %error.message, "validation failed");
                    return Some(CommandResult::Error(error));
                }
            }
        }
        None
    }

    /// Feeds `result` through the process or alter stage.
    ///
    /// A hook returning a value replaces the result; one returning nothing
    /// keeps it. An error becomes an error-result and stops the chain.
    pub fn process_results(
        &self,
        stage: HookStage,
        mut result: CommandResult,
        data: &CommandData,
    ) -> CommandResult {
        debug_assert!(matches!(stage, HookStage::Process | HookStage::Alter));
        for hook in self.resolve(stage) {
            let Hook::Process(processor) = hook else {
                continue;
            };
            match processor.process(&result, data) {
                Ok(Some(replacement)) => result = replacement,
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(%stage, error = %err, "result hook failed");
                    return CommandResult::Error(CommandError::from_error(&err));
                }
            }
        }
        result
    }

    /// First status any determiner claims for `result`.
    pub fn determine_status(&self, result: &CommandResult) -> Option<i32> {
        self.resolve(HookStage::Status)
            .into_iter()
            .find_map(|hook| match hook {
                Hook::Status(determiner) => determiner.determine_status(result),
                _ => None,
            })
    }

    /// First output any extractor pulls out of `result`.
    pub fn extract_output(&self, result: &CommandResult) -> Option<CommandResult> {
        self.resolve(HookStage::Extract)
            .into_iter()
            .find_map(|hook| match hook {
                Hook::Extract(extractor) => extractor.extract_output(result),
                _ => None,
            })
    }

    /// The callback that replaces the command's own, if any hook provides
    /// one. When several do, the first wins.
    pub fn replacement_command(&self) -> Option<Rc<dyn CommandCallback>> {
        let mut replacements = self
            .resolve(HookStage::ReplaceCommand)
            .into_iter()
            .filter_map(|hook| match hook {
                Hook::ReplaceCommand(callback) => Some(callback),
                _ => None,
            });
        let first = replacements.next()?;
        let ignored = replacements.count();
        if ignored > 0 {
            tracing::warn!(
                scopes = ?self.names,
                ignored,
                "more than one replace-command hook; using the first"
            );
        }
        Some(first)
    }
}
