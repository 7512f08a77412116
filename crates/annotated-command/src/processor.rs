//! The command processor.
//!
//! [`CommandProcessor::process`] runs one invocation end to end:
//!
//! 1. validate the call list
//! 2. call the command (or the callback a replace-command hook supplies)
//! 3. run process hooks, then alter hooks
//! 4. determine the exit status
//! 5. extract the displayable output
//! 6. pick the output channel and formatter, and write
//!
//! Steps 1 to 3 are [`CommandProcessor::validate_run_and_alter`]; steps 4 to
//! 6 are [`CommandProcessor::handle_results`]. Every error raised on the way
//! is turned into an error-result, so `process` always returns a status.

use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::annotation::AnnotationData;
use crate::format::{FormatterManager, FormatterOptions};
use crate::hooks::{HookDispatcher, HookManager, HookStage};
use crate::input::{CommandCallback, CommandData, Options};
use crate::output::OutputSink;
use crate::result::{CommandError, CommandResult};

/// Renders an error-result's message before it is written.
pub type DisplayErrorFn = Rc<dyn Fn(&str) -> String>;

/// Processor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Format used when neither `--format` nor `--pipe` is given
    pub default_format: String,
    /// Format used with `--pipe`
    pub pipe_format: String,
    /// Whether commands get `--format` and `--pipe` options
    pub format_options: bool,
    /// Treat output that is not a terminal as if `--pipe` were given
    pub pipe_when_redirected: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            default_format: "string".to_string(),
            pipe_format: "tsv".to_string(),
            format_options: true,
            pipe_when_redirected: false,
        }
    }
}

/// Runs command invocations through the hook pipeline.
pub struct CommandProcessor {
    hooks: HookManager,
    formatters: FormatterManager,
    config: ProcessorConfig,
    display_error: Option<DisplayErrorFn>,
}

impl CommandProcessor {
    /// A processor with the built-in formatters and default settings.
    pub fn new(hooks: HookManager) -> Self {
        Self::builder().hooks(hooks).build()
    }

    pub fn builder() -> CommandProcessorBuilder {
        CommandProcessorBuilder::default()
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    pub fn formatters(&self) -> &FormatterManager {
        &self.formatters
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Installs the function that renders error-result messages.
    pub fn display_error_with<F>(&mut self, f: F)
    where
        F: Fn(&str) -> String + 'static,
    {
        self.display_error = Some(Rc::new(f));
    }

    /// Hook dispatcher for a command known by `names`.
    pub fn dispatcher<'a>(&'a self, names: &'a [String]) -> HookDispatcher<'a> {
        HookDispatcher::new(&self.hooks, names)
    }

    /// Runs one invocation and returns its exit status.
    ///
    /// `names` are the command's hook scopes: name, aliases and command-file
    /// identity.
    #[tracing::instrument(skip_all, fields(command = %data.input().command()))]
    pub fn process(
        &self,
        output: &mut dyn OutputSink,
        names: &[String],
        callback: &dyn CommandCallback,
        data: &mut CommandData,
    ) -> i32 {
        let result = self.validate_run_and_alter(output, names, callback, data);
        self.handle_results(output, names, result, data)
    }

    /// Validates the call list, runs the command and its result hooks.
    ///
    /// A failing validator skips the command and the result hooks. A failing
    /// command still goes through the result hooks as an error-result.
    pub fn validate_run_and_alter(
        &self,
        output: &mut dyn OutputSink,
        names: &[String],
        callback: &dyn CommandCallback,
        data: &mut CommandData,
    ) -> CommandResult {
        let dispatcher = self.dispatcher(names);

        if let Some(error) = dispatcher.validate(data) {
            return error;
        }

        let replacement = dispatcher.replacement_command();
        let callback: &dyn CommandCallback = match &replacement {
            Some(replacement) => {
                tracing::debug!("running replacement command");
                &**replacement
            }
            None => callback,
        };

        let result = {
            let mut invocation = data.invocation(output);
            match callback.call(&mut invocation) {
                Ok(result) => result,
                Err(err) => {
                    let error = CommandError::from_error(&err);
                    tracing::debug!(code = error.code, message = %error.message, "command failed");
                    CommandResult::Error(error)
                }
            }
        };

        let result = dispatcher.process_results(HookStage::Process, result, data);
        dispatcher.process_results(HookStage::Alter, result, data)
    }

    /// Determines the status, extracts and writes the output.
    pub fn handle_results(
        &self,
        output: &mut dyn OutputSink,
        names: &[String],
        result: CommandResult,
        data: &CommandData,
    ) -> i32 {
        let dispatcher = self.dispatcher(names);
        let (status, result) = determine_status(&dispatcher, result);
        let is_error = result.is_error();
        let display = extract_output(&dispatcher, &result);
        tracing::debug!(status, is_error, "command finished");

        if status != 0 {
            if let Some(errors) = output.error_output() {
                self.write_failure(errors, &display, is_error);
                return status;
            }
            self.write_failure(output, &display, is_error);
            return status;
        }

        let format = self.resolve_format(data.options(), data.annotations(), output.is_terminal());
        let options = FormatterOptions {
            format,
            options: data.options().clone(),
            annotations: data.annotations().clone(),
        };
        self.write_success(output, &display, &options)
    }

    /// Format name for a successful result: `--format`, then the pipe format
    /// when `--pipe` is set (or output is redirected and
    /// `pipe_when_redirected` is on), then the default.
    fn resolve_format(&self, options: &Options, annotations: &AnnotationData, terminal: bool) -> String {
        if let Some(Value::String(format)) = options.get("format") {
            if !format.is_empty() {
                return format.clone();
            }
        }
        let piped = matches!(options.get("pipe"), Some(Value::Bool(true)))
            || (self.config.pipe_when_redirected && !terminal);
        if piped {
            return annotations.get("format-pipe", &self.config.pipe_format);
        }
        annotations.get("default-format", &self.config.default_format)
    }

    /// Writes the output of a failed command. Only plain text is written.
    fn write_failure(&self, sink: &mut dyn OutputSink, display: &CommandResult, is_error: bool) {
        let Some(text) = display.as_text() else {
            if !display.is_empty() {
                tracing::debug!("dropping structured output of a failed command");
            }
            return;
        };
        let rendered = match (&self.display_error, is_error) {
            (Some(render), true) => render(text),
            _ => text.to_string(),
        };
        if let Err(err) = sink.write_line(&rendered) {
            tracing::error!(error = %err, "failed to write command output");
        }
    }

    /// Writes the output of a successful command and returns the final
    /// status. A formatter error is reported and turns the status into `1`.
    fn write_success(
        &self,
        output: &mut dyn OutputSink,
        display: &CommandResult,
        options: &FormatterOptions,
    ) -> i32 {
        if display.is_empty() {
            return 0;
        }

        if !self.formatters.has_formatter(&options.format) {
            match display.as_text() {
                Some(text) => {
                    if let Err(err) = output.write_line(text) {
                        tracing::error!(error = %err, "failed to write command output");
                    }
                }
                None => tracing::debug!(
                    format = %options.format,
                    "no formatter for structured output; nothing written"
                ),
            }
            return 0;
        }

        match self
            .formatters
            .write(output, &display.to_value(), options)
        {
            Ok(()) => 0,
            Err(err) => {
                tracing::warn!(format = %options.format, error = %err, "formatting failed");
                let message = err.to_string();
                let written = match output.error_output() {
                    Some(errors) => errors.write_line(&message),
                    None => output.write_line(&message),
                };
                if let Err(err) = written {
                    tracing::error!(error = %err, "failed to write format error");
                }
                1
            }
        }
    }
}

/// Exit status in priority order: an explicit code on the result, the
/// first status determiner, a bare integer result (which is then cleared),
/// else `0`.
fn determine_status(
    dispatcher: &HookDispatcher<'_>,
    result: CommandResult,
) -> (i32, CommandResult) {
    if let Some(code) = result.exit_code() {
        return (code, result);
    }
    if let Some(code) = dispatcher.determine_status(&result) {
        return (code, result);
    }
    if let CommandResult::Integer(value) = result {
        let code = i32::try_from(value).unwrap_or(1);
        return (code, CommandResult::Empty);
    }
    (0, result)
}

/// Displayable output: what the result carries, the first extractor, or the
/// result itself.
fn extract_output(dispatcher: &HookDispatcher<'_>, result: &CommandResult) -> CommandResult {
    result
        .output_data()
        .or_else(|| dispatcher.extract_output(result))
        .unwrap_or_else(|| result.clone())
}

impl fmt::Debug for CommandProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("hooks", &self.hooks)
            .field("formatters", &self.formatters)
            .field("config", &self.config)
            .field("display_error", &self.display_error.is_some())
            .finish()
    }
}

/// Builder for [`CommandProcessor`].
#[derive(Default)]
pub struct CommandProcessorBuilder {
    hooks: HookManager,
    formatters: Option<FormatterManager>,
    config: ProcessorConfig,
    display_error: Option<DisplayErrorFn>,
}

impl CommandProcessorBuilder {
    pub fn hooks(mut self, hooks: HookManager) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the built-in formatters.
    pub fn formatters(mut self, formatters: FormatterManager) -> Self {
        self.formatters = Some(formatters);
        self
    }

    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn default_format(mut self, format: impl Into<String>) -> Self {
        self.config.default_format = format.into();
        self
    }

    pub fn pipe_format(mut self, format: impl Into<String>) -> Self {
        self.config.pipe_format = format.into();
        self
    }

    /// Whether commands get `--format` and `--pipe` options. On by default.
    pub fn format_options(mut self, enabled: bool) -> Self {
        self.config.format_options = enabled;
        self
    }

    /// Uses the pipe format when the sink is not a terminal. Off by default.
    pub fn pipe_when_redirected(mut self, enabled: bool) -> Self {
        self.config.pipe_when_redirected = enabled;
        self
    }

    pub fn display_error_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.display_error = Some(Rc::new(f));
        self
    }

    pub fn build(self) -> CommandProcessor {
        CommandProcessor {
            hooks: self.hooks,
            formatters: self.formatters.unwrap_or_default(),
            config: self.config,
            display_error: self.display_error,
        }
    }
}
