//! Command results and error-results.
//!
//! A command callback produces a [`CommandResult`]. Processors and alterers
//! may replace it, status determiners read it, and output extractors pull the
//! displayable part out of it before it is written.
//!
//! Two variants carry capabilities the pipeline checks before consulting any
//! hook:
//!
//! - [`CommandResult::Status`] and [`CommandResult::Error`] carry an explicit
//!   exit code ([`CommandResult::exit_code`]).
//! - The same two variants carry displayable output
//!   ([`CommandResult::output_data`]): the wrapped data, or the error message.

use serde_json::Value;
use thiserror::Error;

/// An error-result: a message and a status code that stand in for a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    pub message: String,
    pub code: i32,
}

impl CommandError {
    /// Creates an error-result with the default code `1`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Normalizes an arbitrary error into an error-result.
    ///
    /// A `CommandError` anywhere in the chain keeps its code, an I/O error
    /// with an OS code uses that code, and everything else gets `1`. The
    /// message is always the outermost error's display text.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| {
                if let Some(command) = cause.downcast_ref::<CommandError>() {
                    return Some(command.code);
                }
                cause
                    .downcast_ref::<std::io::Error>()
                    .and_then(std::io::Error::raw_os_error)
            })
            .unwrap_or(1);

        Self {
            message: err.to_string(),
            code,
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::from_error(&err)
    }
}

/// The value flowing through the result stages of the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CommandResult {
    /// No value
    #[default]
    Empty,
    /// A plain string, written verbatim with a trailing newline
    Text(String),
    /// A bare integer; becomes the exit status when nothing else claims one
    Integer(i64),
    /// Structured data, handed to a formatter
    Data(Value),
    /// Data paired with an explicit exit code
    Status { data: Value, code: i32 },
    /// An error-result
    Error(CommandError),
}

impl CommandResult {
    pub fn text(s: impl Into<String>) -> Self {
        CommandResult::Text(s.into())
    }

    pub fn data(value: impl Into<Value>) -> Self {
        CommandResult::Data(value.into())
    }

    /// Wraps `data` with an explicit exit code.
    pub fn with_exit_code(data: impl Into<Value>, code: i32) -> Self {
        CommandResult::Status {
            data: data.into(),
            code,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        CommandResult::Error(CommandError::new(message))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CommandResult::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CommandResult::Error(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CommandResult::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&CommandError> {
        match self {
            CommandResult::Error(e) => Some(e),
            _ => None,
        }
    }

    /// The explicit exit code this result carries, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandResult::Status { code, .. } => Some(*code),
            CommandResult::Error(e) => Some(e.code),
            _ => None,
        }
    }

    /// The displayable output this result carries, if any.
    pub fn output_data(&self) -> Option<CommandResult> {
        match self {
            CommandResult::Status { data, .. } => Some(CommandResult::from(data.clone())),
            CommandResult::Error(e) => Some(CommandResult::Text(e.message.clone())),
            _ => None,
        }
    }

    /// Structured form handed to formatters.
    pub fn to_value(&self) -> Value {
        match self {
            CommandResult::Empty => Value::Null,
            CommandResult::Text(s) => Value::String(s.clone()),
            CommandResult::Integer(i) => Value::from(*i),
            CommandResult::Data(v) => v.clone(),
            CommandResult::Status { data, .. } => data.clone(),
            CommandResult::Error(e) => Value::String(e.message.clone()),
        }
    }
}

impl From<Value> for CommandResult {
    /// `null` becomes `Empty` and strings become `Text`; everything else is
    /// structured data.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CommandResult::Empty,
            Value::String(s) => CommandResult::Text(s),
            other => CommandResult::Data(other),
        }
    }
}

impl From<String> for CommandResult {
    fn from(s: String) -> Self {
        CommandResult::Text(s)
    }
}

impl From<&str> for CommandResult {
    fn from(s: &str) -> Self {
        CommandResult::Text(s.to_string())
    }
}

impl From<i64> for CommandResult {
    fn from(i: i64) -> Self {
        CommandResult::Integer(i)
    }
}

impl From<()> for CommandResult {
    fn from(_: ()) -> Self {
        CommandResult::Empty
    }
}

impl From<CommandError> for CommandResult {
    fn from(e: CommandError) -> Self {
        CommandResult::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::json;

    #[test]
    fn test_command_error_defaults_to_code_one() {
        let err = CommandError::new("nope");
        assert_eq!(err.code, 1);
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_from_error_keeps_command_error_code() {
        let err = anyhow::Error::new(CommandError::with_code("bad input", 3));
        let normalized = CommandError::from_error(&err);
        assert_eq!(normalized, CommandError::with_code("bad input", 3));
    }

    #[test]
    fn test_from_error_finds_code_through_context() {
        let err: anyhow::Result<()> =
            Err(CommandError::with_code("inner", 4)).context("while running");
        let normalized = CommandError::from_error(&err.unwrap_err());
        assert_eq!(normalized.code, 4);
        assert_eq!(normalized.message, "while running");
    }

    #[test]
    fn test_from_error_uses_os_code() {
        let io = std::io::Error::from_raw_os_error(2);
        let normalized = CommandError::from_error(&anyhow::Error::new(io));
        assert_eq!(normalized.code, 2);
    }

    #[test]
    fn test_from_error_without_code() {
        let normalized = CommandError::from_error(&anyhow::anyhow!("plain failure"));
        assert_eq!(normalized, CommandError::new("plain failure"));
    }

    #[test]
    fn test_capabilities() {
        assert_eq!(CommandResult::text("x").exit_code(), None);
        assert_eq!(CommandResult::Integer(7).exit_code(), None);
        assert_eq!(CommandResult::with_exit_code(json!({"a": 1}), 5).exit_code(), Some(5));
        assert_eq!(CommandResult::error("boom").exit_code(), Some(1));

        assert_eq!(CommandResult::text("x").output_data(), None);
        assert_eq!(
            CommandResult::with_exit_code("done", 0).output_data(),
            Some(CommandResult::text("done"))
        );
        assert_eq!(
            CommandResult::error("boom").output_data(),
            Some(CommandResult::text("boom"))
        );
    }

    #[test]
    fn test_from_value() {
        assert_eq!(CommandResult::from(Value::Null), CommandResult::Empty);
        assert_eq!(CommandResult::from(json!("s")), CommandResult::text("s"));
        assert_eq!(
            CommandResult::from(json!([1, 2])),
            CommandResult::Data(json!([1, 2]))
        );
    }
}
