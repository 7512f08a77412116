//! Metadata-driven command dispatch for clap-based CLIs.
//!
//! Commands are plain callbacks described by a [`CommandMetadata`]: name,
//! aliases, arguments, options, help text and free-form annotations. Each
//! invocation runs through a layered pipeline with named extension points
//! ("hooks") that can intercept every stage for one command, one command
//! file, or all commands.
//!
//! # Pipeline
//!
//! ```text
//! argv ─► clap ─► AnnotatedCommand
//!                   ├─ command-event, initialize, interact hooks
//!                   └─ CommandProcessor::process
//!                        ├─ validate         (validators may replace args or fail)
//!                        ├─ invoke callback  (errors become error-results)
//!                        ├─ process, alter   (hooks may replace the result)
//!                        ├─ determine status
//!                        ├─ extract output
//!                        └─ format and write ─► exit status
//! ```
//!
//! Hook resolution is phase-major, scope-minor: every `pre-` hook of a stage
//! runs before any main hook, and every main hook before any `post-` hook,
//! whatever scope they were registered under. See [`hooks`].
//!
//! # Example
//!
//! ```
//! use annotated_command::{
//!     ArgumentDef, BufferedOutput, CommandFactory, CommandFile, CommandMetadata,
//!     CommandResult, OptionDef,
//! };
//!
//! let file = CommandFile::new("ExampleCommands").command(
//!     CommandMetadata::builder("testArithmatic")
//!         .argument(ArgumentDef::new("one"))
//!         .argument(ArgumentDef::new("two"))
//!         .option(OptionDef::flag("negate")),
//!     |inv| {
//!         let sum = inv.arg_i64(0)? + inv.arg_i64(1)?;
//!         let sum = if inv.option_bool("negate") { -sum } else { sum };
//!         Ok(CommandResult::text(sum.to_string()))
//!     },
//! );
//!
//! let mut factory = CommandFactory::new();
//! factory.register_command_file(file).unwrap();
//! let commands = factory.build().unwrap();
//!
//! let mut out = BufferedOutput::new();
//! let status = commands[0]
//!     .run_from(["test:arithmatic", "2", "3", "--negate"], &mut out)
//!     .unwrap();
//! assert_eq!(status, 0);
//! assert_eq!(out.contents(), "-5\n");
//! ```

mod annotation;
mod app;
mod command;
mod factory;
mod format;
pub mod hooks;
mod input;
mod metadata;
mod output;
mod processor;
mod result;

pub use annotation::{AnnotationData, AnnotationError, AnnotationValue};
pub use app::{Application, ApplicationBuilder};
pub use command::AnnotatedCommand;
pub use factory::{CommandFactory, CommandFile};
pub use format::{FormatError, Formatter, FormatterManager, FormatterOptions};
pub use hooks::{
    CommandEventHook, Hook, HookDispatcher, HookKind, HookManager, HookPhase, HookStage,
    HookTarget, InitializeHook, InteractHook, OptionHook, OutputExtractor, RegistrationError,
    ResultProcessor, StatusDeterminer, UnknownHookKind, Validator, WILDCARD,
};
pub use input::{
    CommandArgs, CommandCallback, CommandData, CommandInput, Invocation, Options, SpecialArg,
};
pub use metadata::{
    command_name_from_method, ArgumentDef, CommandMetadata, CommandMetadataBuilder,
    MetadataError, OptionDef, OptionKind, SpecialParameter,
};
pub use output::{BufferedOutput, ConsoleOutput, OutputSink, StreamOutput};
pub use processor::{CommandProcessor, CommandProcessorBuilder, DisplayErrorFn, ProcessorConfig};
pub use result::{CommandError, CommandResult};
