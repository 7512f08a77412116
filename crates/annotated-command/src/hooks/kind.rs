//! Hook kinds, stages and phases.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sub-stage within a hook stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookPhase {
    Pre,
    Main,
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Pre => write!(f, "pre"),
            HookPhase::Main => write!(f, "main"),
            HookPhase::Post => write!(f, "post"),
        }
    }
}

/// A pipeline stage. Each stage resolves one or more hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    CommandEvent,
    Initialize,
    Interact,
    Option,
    Validate,
    Process,
    Alter,
    Status,
    Extract,
    ReplaceCommand,
}

impl HookStage {
    /// The kinds this stage resolves, in execution order.
    ///
    /// Every hook of an earlier kind runs before any hook of a later kind,
    /// whatever scope it was registered under.
    pub fn kinds(self) -> &'static [HookKind] {
        use HookKind::*;
        match self {
            HookStage::CommandEvent => &[PreCommandEvent, CommandEvent, PostCommandEvent],
            HookStage::Initialize => &[PreInitialize, Initialize, PostInitialize],
            HookStage::Interact => &[PreInteract, Interact, PostInteract],
            HookStage::Option => &[PreOption, Option, PostOption],
            HookStage::Validate => &[PreValidate, Validate, PostValidate],
            HookStage::Process => &[PreProcess, Process, PostProcess],
            HookStage::Alter => &[PreAlter, Alter, PostAlter, PostCommand],
            HookStage::Status => &[Status],
            HookStage::Extract => &[Extract],
            HookStage::ReplaceCommand => &[ReplaceCommand],
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = self
            .kinds()
            .iter()
            .find(|k| k.phase() == HookPhase::Main)
            .copied()
            .unwrap_or(HookKind::Status);
        write!(f, "{}", main)
    }
}

/// Every hook slot a handler can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PreCommandEvent,
    CommandEvent,
    PostCommandEvent,
    PreInitialize,
    Initialize,
    PostInitialize,
    PreInteract,
    Interact,
    PostInteract,
    PreOption,
    Option,
    PostOption,
    PreValidate,
    Validate,
    PostValidate,
    PreProcess,
    Process,
    PostProcess,
    PreAlter,
    Alter,
    PostAlter,
    /// Runs after `post-alter` as part of the alter stage
    PostCommand,
    Status,
    Extract,
    ReplaceCommand,
}

impl HookKind {
    pub const ALL: [HookKind; 25] = [
        HookKind::PreCommandEvent,
        HookKind::CommandEvent,
        HookKind::PostCommandEvent,
        HookKind::PreInitialize,
        HookKind::Initialize,
        HookKind::PostInitialize,
        HookKind::PreInteract,
        HookKind::Interact,
        HookKind::PostInteract,
        HookKind::PreOption,
        HookKind::Option,
        HookKind::PostOption,
        HookKind::PreValidate,
        HookKind::Validate,
        HookKind::PostValidate,
        HookKind::PreProcess,
        HookKind::Process,
        HookKind::PostProcess,
        HookKind::PreAlter,
        HookKind::Alter,
        HookKind::PostAlter,
        HookKind::PostCommand,
        HookKind::Status,
        HookKind::Extract,
        HookKind::ReplaceCommand,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::PreCommandEvent => "pre-command-event",
            HookKind::CommandEvent => "command-event",
            HookKind::PostCommandEvent => "post-command-event",
            HookKind::PreInitialize => "pre-initialize",
            HookKind::Initialize => "initialize",
            HookKind::PostInitialize => "post-initialize",
            HookKind::PreInteract => "pre-interact",
            HookKind::Interact => "interact",
            HookKind::PostInteract => "post-interact",
            HookKind::PreOption => "pre-option",
            HookKind::Option => "option",
            HookKind::PostOption => "post-option",
            HookKind::PreValidate => "pre-validate",
            HookKind::Validate => "validate",
            HookKind::PostValidate => "post-validate",
            HookKind::PreProcess => "pre-process",
            HookKind::Process => "process",
            HookKind::PostProcess => "post-process",
            HookKind::PreAlter => "pre-alter",
            HookKind::Alter => "alter",
            HookKind::PostAlter => "post-alter",
            HookKind::PostCommand => "post-command",
            HookKind::Status => "status",
            HookKind::Extract => "extract",
            HookKind::ReplaceCommand => "replace-command",
        }
    }

    pub fn stage(self) -> HookStage {
        use HookKind::*;
        match self {
            PreCommandEvent | CommandEvent | PostCommandEvent => HookStage::CommandEvent,
            PreInitialize | Initialize | PostInitialize => HookStage::Initialize,
            PreInteract | Interact | PostInteract => HookStage::Interact,
            PreOption | Option | PostOption => HookStage::Option,
            PreValidate | Validate | PostValidate => HookStage::Validate,
            PreProcess | Process | PostProcess => HookStage::Process,
            PreAlter | Alter | PostAlter | PostCommand => HookStage::Alter,
            Status => HookStage::Status,
            Extract => HookStage::Extract,
            ReplaceCommand => HookStage::ReplaceCommand,
        }
    }

    pub fn phase(self) -> HookPhase {
        use HookKind::*;
        match self {
            PreCommandEvent | PreInitialize | PreInteract | PreOption | PreValidate
            | PreProcess | PreAlter => HookPhase::Pre,
            PostCommandEvent | PostInitialize | PostInteract | PostOption | PostValidate
            | PostProcess | PostAlter | PostCommand => HookPhase::Post,
            _ => HookPhase::Main,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown hook kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hook kind '{0}'")]
pub struct UnknownHookKind(pub String);

impl FromStr for HookKind {
    type Err = UnknownHookKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "init" => HookKind::Initialize,
            "pre-init" => HookKind::PreInitialize,
            "post-init" => HookKind::PostInitialize,
            "pre-option-hook" => HookKind::PreOption,
            "option-hook" => HookKind::Option,
            "post-option-hook" => HookKind::PostOption,
            "post-command-hook" => HookKind::PostCommand,
            other => {
                return HookKind::ALL
                    .iter()
                    .copied()
                    .find(|k| k.as_str() == other)
                    .ok_or_else(|| UnknownHookKind(s.to_string()))
            }
        };
        Ok(kind)
    }
}
