//! Hook handler contracts.
//!
//! Each hook stage has a narrow trait describing what its handlers do. Every
//! trait is implemented for plain functions and closures with the matching
//! signature, so a hook can be either an object implementing the trait or a
//! function value. [`Hook`] is the closed set of handler variants the
//! registry stores; dispatch is one match per stage.

use std::fmt;
use std::rc::Rc;

use super::kind::HookStage;
use crate::annotation::AnnotationData;
use crate::input::{CommandArgs, CommandCallback, CommandData, CommandInput, Invocation};
use crate::metadata::{CommandMetadata, OptionDef};
use crate::output::OutputSink;
use crate::result::CommandResult;

/// Observes a command about to run. An error aborts the invocation.
pub trait CommandEventHook {
    fn on_command_event(
        &self,
        input: &CommandInput,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()>;
}

impl<F> CommandEventHook for F
where
    F: Fn(&CommandInput, &AnnotationData) -> anyhow::Result<()>,
{
    fn on_command_event(
        &self,
        input: &CommandInput,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        self(input, annotations)
    }
}

/// Adjusts parsed input before validation, e.g. to fill option defaults.
pub trait InitializeHook {
    fn initialize(&self, input: &mut CommandInput, annotations: &AnnotationData)
        -> anyhow::Result<()>;
}

impl<F> InitializeHook for F
where
    F: Fn(&mut CommandInput, &AnnotationData) -> anyhow::Result<()>,
{
    fn initialize(
        &self,
        input: &mut CommandInput,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        self(input, annotations)
    }
}

/// Like [`InitializeHook`], with access to the output sink.
pub trait InteractHook {
    fn interact(
        &self,
        input: &mut CommandInput,
        output: &mut dyn OutputSink,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()>;
}

impl<F> InteractHook for F
where
    F: Fn(&mut CommandInput, &mut dyn OutputSink, &AnnotationData) -> anyhow::Result<()>,
{
    fn interact(
        &self,
        input: &mut CommandInput,
        output: &mut dyn OutputSink,
        annotations: &AnnotationData,
    ) -> anyhow::Result<()> {
        self(input, output, annotations)
    }
}

/// Contributes extra options to a command's definition.
pub trait OptionHook {
    fn options(&self, command: &CommandMetadata) -> Vec<OptionDef>;
}

impl<F> OptionHook for F
where
    F: Fn(&CommandMetadata) -> Vec<OptionDef>,
{
    fn options(&self, command: &CommandMetadata) -> Vec<OptionDef> {
        self(command)
    }
}

/// Checks the call list before the command runs.
///
/// `Ok(None)` passes, `Ok(Some(args))` replaces the call list for later
/// validators and the command, and `Err` stops the invocation with an
/// error-result.
pub trait Validator {
    fn validate(&self, data: &CommandData) -> anyhow::Result<Option<CommandArgs>>;
}

impl<F> Validator for F
where
    F: Fn(&CommandData) -> anyhow::Result<Option<CommandArgs>>,
{
    fn validate(&self, data: &CommandData) -> anyhow::Result<Option<CommandArgs>> {
        self(data)
    }
}

/// Processes or alters a result. Used by both the process and alter stages.
///
/// `Ok(None)` keeps the current result, `Ok(Some(result))` replaces it.
pub trait ResultProcessor {
    fn process(
        &self,
        result: &CommandResult,
        data: &CommandData,
    ) -> anyhow::Result<Option<CommandResult>>;
}

impl<F> ResultProcessor for F
where
    F: Fn(&CommandResult, &CommandData) -> anyhow::Result<Option<CommandResult>>,
{
    fn process(
        &self,
        result: &CommandResult,
        data: &CommandData,
    ) -> anyhow::Result<Option<CommandResult>> {
        self(result, data)
    }
}

/// Maps a result to an exit status. `None` defers to the next determiner.
pub trait StatusDeterminer {
    fn determine_status(&self, result: &CommandResult) -> Option<i32>;
}

impl<F> StatusDeterminer for F
where
    F: Fn(&CommandResult) -> Option<i32>,
{
    fn determine_status(&self, result: &CommandResult) -> Option<i32> {
        self(result)
    }
}

/// Pulls the displayable output out of a result. `None` defers to the next
/// extractor.
pub trait OutputExtractor {
    fn extract_output(&self, result: &CommandResult) -> Option<CommandResult>;
}

impl<F> OutputExtractor for F
where
    F: Fn(&CommandResult) -> Option<CommandResult>,
{
    fn extract_output(&self, result: &CommandResult) -> Option<CommandResult> {
        self(result)
    }
}

/// A registered hook handler.
#[derive(Clone)]
pub enum Hook {
    CommandEvent(Rc<dyn CommandEventHook>),
    Initialize(Rc<dyn InitializeHook>),
    Interact(Rc<dyn InteractHook>),
    Options(Rc<dyn OptionHook>),
    Validate(Rc<dyn Validator>),
    /// Serves both the process and the alter stage
    Process(Rc<dyn ResultProcessor>),
    Status(Rc<dyn StatusDeterminer>),
    Extract(Rc<dyn OutputExtractor>),
    /// A callback run instead of the command's own
    ReplaceCommand(Rc<dyn CommandCallback>),
}

impl Hook {
    pub fn command_event<F>(f: F) -> Self
    where
        F: Fn(&CommandInput, &AnnotationData) -> anyhow::Result<()> + 'static,
    {
        Hook::CommandEvent(Rc::new(f))
    }

    pub fn initialize<F>(f: F) -> Self
    where
        F: Fn(&mut CommandInput, &AnnotationData) -> anyhow::Result<()> + 'static,
    {
        Hook::Initialize(Rc::new(f))
    }

    pub fn interact<F>(f: F) -> Self
    where
        F: Fn(&mut CommandInput, &mut dyn OutputSink, &AnnotationData) -> anyhow::Result<()>
            + 'static,
    {
        Hook::Interact(Rc::new(f))
    }

    pub fn options<F>(f: F) -> Self
    where
        F: Fn(&CommandMetadata) -> Vec<OptionDef> + 'static,
    {
        Hook::Options(Rc::new(f))
    }

    pub fn validate<F>(f: F) -> Self
    where
        F: Fn(&CommandData) -> anyhow::Result<Option<CommandArgs>> + 'static,
    {
        Hook::Validate(Rc::new(f))
    }

    pub fn process<F>(f: F) -> Self
    where
        F: Fn(&CommandResult, &CommandData) -> anyhow::Result<Option<CommandResult>> + 'static,
    {
        Hook::Process(Rc::new(f))
    }

    /// Same contract as [`Hook::process`]; reads better at alter call sites.
    pub fn alter<F>(f: F) -> Self
    where
        F: Fn(&CommandResult, &CommandData) -> anyhow::Result<Option<CommandResult>> + 'static,
    {
        Hook::Process(Rc::new(f))
    }

    pub fn status<F>(f: F) -> Self
    where
        F: Fn(&CommandResult) -> Option<i32> + 'static,
    {
        Hook::Status(Rc::new(f))
    }

    pub fn extract<F>(f: F) -> Self
    where
        F: Fn(&CommandResult) -> Option<CommandResult> + 'static,
    {
        Hook::Extract(Rc::new(f))
    }

    pub fn replace_command<F>(f: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> anyhow::Result<CommandResult> + 'static,
    {
        Hook::ReplaceCommand(Rc::new(f))
    }

    /// Whether this handler can be dispatched by `stage`.
    pub fn serves(&self, stage: HookStage) -> bool {
        matches!(
            (self, stage),
            (Hook::CommandEvent(_), HookStage::CommandEvent)
                | (Hook::Initialize(_), HookStage::Initialize)
                | (Hook::Interact(_), HookStage::Interact)
                | (Hook::Options(_), HookStage::Option)
                | (Hook::Validate(_), HookStage::Validate)
                | (Hook::Process(_), HookStage::Process)
                | (Hook::Process(_), HookStage::Alter)
                | (Hook::Status(_), HookStage::Status)
                | (Hook::Extract(_), HookStage::Extract)
                | (Hook::ReplaceCommand(_), HookStage::ReplaceCommand)
        )
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Hook::CommandEvent(_) => "command-event",
            Hook::Initialize(_) => "initialize",
            Hook::Interact(_) => "interact",
            Hook::Options(_) => "options",
            Hook::Validate(_) => "validate",
            Hook::Process(_) => "process",
            Hook::Status(_) => "status",
            Hook::Extract(_) => "extract",
            Hook::ReplaceCommand(_) => "replace-command",
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{}", self.variant_name())
    }
}
