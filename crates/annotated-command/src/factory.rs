//! Command files and command registration.
//!
//! A [`CommandFile`] groups command methods and hook methods under one
//! identity. Registering it with a [`CommandFactory`] builds every method's
//! metadata, registers the hook methods in the factory's [`HookManager`]
//! under the target their `hook` annotation names, and queues the commands.
//! [`CommandFactory::build`] then freezes the registry into a
//! [`CommandProcessor`] and creates the [`AnnotatedCommand`]s.
//!
//! ```
//! use annotated_command::{
//!     ArgumentDef, CommandFactory, CommandFile, CommandMetadata, CommandResult, Hook,
//! };
//!
//! let file = CommandFile::new("ExampleCommands")
//!     .command(
//!         CommandMetadata::builder("testHook").argument(ArgumentDef::new("parameter")),
//!         |inv| Ok(CommandResult::text(format!("[{}]", inv.arg_str(0).unwrap_or_default()))),
//!     )
//!     .hook(
//!         CommandMetadata::builder("hookTestHook").annotation("hook", "alter test:hook"),
//!         Hook::alter(|result, _| {
//!             Ok(Some(CommandResult::text(format!("<{}>", result.as_text().unwrap_or_default()))))
//!         }),
//!     );
//!
//! let mut factory = CommandFactory::new();
//! factory.register_command_file(file).unwrap();
//! let commands = factory.build().unwrap();
//! assert_eq!(commands[0].name(), "test:hook");
//! ```

use std::rc::Rc;

use crate::annotation::AnnotationData;
use crate::command::AnnotatedCommand;
use crate::hooks::{Hook, HookManager, HookStage, HookTarget, RegistrationError, WILDCARD};
use crate::input::{CommandCallback, Invocation};
use crate::metadata::{CommandMetadata, CommandMetadataBuilder, OptionDef};
use crate::processor::{CommandProcessor, CommandProcessorBuilder};
use crate::result::CommandResult;

/// A named bundle of command methods and hook methods.
pub struct CommandFile {
    identity: String,
    commands: Vec<(CommandMetadataBuilder, Rc<dyn CommandCallback>)>,
    hooks: Vec<(CommandMetadataBuilder, Hook)>,
}

impl CommandFile {
    /// `identity` is the scope hooks use to target every command of this
    /// file.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            commands: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Adds a command method.
    pub fn command<F>(mut self, metadata: CommandMetadataBuilder, callback: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> anyhow::Result<CommandResult> + 'static,
    {
        self.commands.push((metadata, Rc::new(callback)));
        self
    }

    /// Adds a command method whose callback is an object.
    pub fn command_object(
        mut self,
        metadata: CommandMetadataBuilder,
        callback: impl CommandCallback + 'static,
    ) -> Self {
        self.commands.push((metadata, Rc::new(callback)));
        self
    }

    /// Adds a hook method. Its metadata must carry a `hook` annotation.
    pub fn hook(mut self, metadata: CommandMetadataBuilder, hook: Hook) -> Self {
        self.hooks.push((metadata, hook));
        self
    }
}

struct PendingCommand {
    identity: String,
    metadata: CommandMetadata,
    callback: Rc<dyn CommandCallback>,
}

/// Options and annotations an option hook method contributes to the
/// commands it targets.
struct Contribution {
    scope: String,
    options: Vec<OptionDef>,
    annotations: AnnotationData,
}

/// Collects command files and builds their commands.
#[derive(Default)]
pub struct CommandFactory {
    hooks: HookManager,
    pending: Vec<PendingCommand>,
    contributions: Vec<Contribution>,
}

impl CommandFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hook registry, for hooks registered outside command files.
    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    /// Registers the hooks of `file` and queues its commands.
    ///
    /// Fails without registering anything when a method's metadata is
    /// invalid, a hook annotation is malformed, a hook's handler cannot
    /// serve its declared kind, or a command name is already taken.
    pub fn register_command_file(&mut self, file: CommandFile) -> Result<(), RegistrationError> {
        let identity = file.identity;
        tracing::debug!(%identity, commands = file.commands.len(), hooks = file.hooks.len(), "registering command file");

        let mut hooks = Vec::with_capacity(file.hooks.len());
        for (builder, hook) in file.hooks {
            let metadata = builder.build()?;
            let annotation = metadata
                .annotation("hook")
                .ok_or_else(|| RegistrationError::MissingHookAnnotation(metadata.method_name().to_string()))?;
            let target = HookTarget::parse(&annotation, metadata.name()).map_err(|source| {
                RegistrationError::InvalidHookKind {
                    method: metadata.method_name().to_string(),
                    source,
                }
            })?;
            if !hook.serves(target.kind.stage()) {
                return Err(RegistrationError::HandlerMismatch {
                    method: metadata.method_name().to_string(),
                    kind: target.kind,
                    handler: hook.variant_name(),
                });
            }
            hooks.push((metadata, target, hook));
        }

        let mut commands = Vec::with_capacity(file.commands.len());
        for (builder, callback) in file.commands {
            let metadata = builder.build()?;
            let taken = self
                .pending
                .iter()
                .map(|p| (&p.identity, &p.metadata))
                .chain(commands.iter().map(|p: &PendingCommand| (&p.identity, &p.metadata)))
                .find(|(_, existing)| {
                    metadata
                        .names()
                        .iter()
                        .any(|name| existing.names().contains(name))
                });
            if let Some((owner, existing)) = taken {
                return Err(RegistrationError::DuplicateCommand {
                    name: existing.name().to_string(),
                    first: format!("{}::{}", owner, existing.method_name()),
                    second: format!("{}::{}", identity, metadata.method_name()),
                });
            }
            commands.push(PendingCommand {
                identity: identity.clone(),
                metadata,
                callback,
            });
        }

        for (metadata, target, hook) in hooks {
            if target.kind.stage() == HookStage::Option {
                let mut annotations = metadata.annotations().clone();
                annotations.remove("hook");
                annotations.remove("command");
                self.contributions.push(Contribution {
                    scope: target.scope.clone(),
                    options: metadata.options().to_vec(),
                    annotations,
                });
            }
            self.hooks.add(hook, target.kind, &target.scope);
        }
        self.pending.extend(commands);
        Ok(())
    }

    /// Builds the commands with a default processor.
    pub fn build(self) -> Result<Vec<AnnotatedCommand>, RegistrationError> {
        self.build_with(CommandProcessor::builder())
    }

    /// Freezes the hook registry into a processor configured by `processor`
    /// and builds every queued command.
    pub fn build_with(
        self,
        processor: CommandProcessorBuilder,
    ) -> Result<Vec<AnnotatedCommand>, RegistrationError> {
        let processor = Rc::new(processor.hooks(self.hooks).build());
        let contributions = self.contributions;

        let commands = self
            .pending
            .into_iter()
            .map(|mut pending| {
                for contribution in &contributions {
                    let targeted = contribution.scope == WILDCARD
                        || contribution.scope == pending.identity
                        || pending.metadata.names().contains(&contribution.scope);
                    if targeted {
                        pending
                            .metadata
                            .absorb(&contribution.options, &contribution.annotations);
                    }
                }
                AnnotatedCommand::new(pending.metadata, pending.callback, processor.clone())
                    .in_command_file(pending.identity)
            })
            .collect();
        Ok(commands)
    }
}
