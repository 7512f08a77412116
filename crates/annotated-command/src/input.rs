//! Invocation input types.
//!
//! - [`CommandInput`]: the parsed input of one invocation, by name
//! - [`CommandArgs`]: the positional call list handed to the callback
//! - [`CommandData`]: everything hooks see about the current invocation
//! - [`Invocation`]: what a callback receives when it is called
//! - [`CommandCallback`]: the callable bound to a command

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

use crate::annotation::AnnotationData;
use crate::metadata::SpecialParameter;
use crate::output::OutputSink;
use crate::result::CommandResult;

/// Option values keyed by option name.
pub type Options = serde_json::Map<String, Value>;

/// Parsed input of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandInput {
    command: String,
    arguments: IndexMap<String, Value>,
    options: Options,
    passthrough: Vec<String>,
}

impl CommandInput {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Name of the command being run.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn set_argument(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.arguments.insert(name.into(), value.into());
    }

    /// Arguments in declaration order.
    pub fn arguments(&self) -> &IndexMap<String, Value> {
        &self.arguments
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(name.into(), value.into());
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Tokens that followed a `--` separator on the command line.
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    pub fn set_passthrough(&mut self, tokens: Vec<String>) {
        self.passthrough = tokens;
    }
}

/// The positional call list: argument values followed by the options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    pub values: Vec<Value>,
    pub options: Options,
}

impl CommandArgs {
    pub fn new(values: Vec<Value>, options: Options) -> Self {
        Self { values, options }
    }

    /// Builds the call list from named input, in argument declaration order.
    pub fn from_input(input: &CommandInput) -> Self {
        Self {
            values: input.arguments.values().cloned().collect(),
            options: input.options.clone(),
        }
    }
}

/// Everything hooks see about the current invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandData {
    annotations: AnnotationData,
    input: CommandInput,
    args: CommandArgs,
    special: Vec<SpecialParameter>,
}

impl CommandData {
    pub fn new(annotations: AnnotationData, input: CommandInput) -> Self {
        let args = CommandArgs::from_input(&input);
        Self {
            annotations,
            input,
            args,
            special: Vec::new(),
        }
    }

    /// Sets the special parameters prepended to the callback's arguments.
    pub fn with_special_parameters(mut self, special: Vec<SpecialParameter>) -> Self {
        self.special = special;
        self
    }

    pub fn annotations(&self) -> &AnnotationData {
        &self.annotations
    }

    pub fn input(&self) -> &CommandInput {
        &self.input
    }

    pub fn args(&self) -> &CommandArgs {
        &self.args
    }

    /// Options of the current call list.
    pub fn options(&self) -> &Options {
        &self.args.options
    }

    pub fn special_parameters(&self) -> &[SpecialParameter] {
        &self.special
    }

    pub(crate) fn replace_args(&mut self, args: CommandArgs) {
        self.args = args;
    }

    /// Builds the invocation for the callback: special parameters first, in
    /// their configured order, then the call list.
    pub(crate) fn invocation<'a>(&'a self, output: &'a mut dyn OutputSink) -> Invocation<'a> {
        let mut output = Some(output);
        let mut special = Vec::with_capacity(self.special.len());
        for parameter in &self.special {
            match parameter {
                SpecialParameter::Input => special.push(SpecialArg::Input(&self.input)),
                SpecialParameter::Output => {
                    if let Some(sink) = output.take() {
                        special.push(SpecialArg::Output(sink));
                    }
                }
            }
        }
        Invocation {
            special,
            values: &self.args.values,
            options: &self.args.options,
        }
    }
}

/// A live pipeline value passed ahead of the user arguments.
pub enum SpecialArg<'a> {
    Input(&'a CommandInput),
    Output(&'a mut dyn OutputSink),
}

impl fmt::Debug for SpecialArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialArg::Input(input) => f.debug_tuple("Input").field(input).finish(),
            SpecialArg::Output(_) => f.write_str("Output(..)"),
        }
    }
}

/// The arguments a callback is called with.
#[derive(Debug)]
pub struct Invocation<'a> {
    special: Vec<SpecialArg<'a>>,
    values: &'a [Value],
    options: &'a Options,
}

impl<'a> Invocation<'a> {
    pub fn special(&self) -> &[SpecialArg<'a>] {
        &self.special
    }

    /// The input special parameter, if requested.
    pub fn input(&self) -> Option<&'a CommandInput> {
        self.special.iter().find_map(|s| match s {
            SpecialArg::Input(input) => Some(*input),
            SpecialArg::Output(_) => None,
        })
    }

    /// The output special parameter, if requested.
    pub fn output(&mut self) -> Option<&mut (dyn OutputSink + 'a)> {
        self.special.iter_mut().find_map(|s| match s {
            SpecialArg::Output(sink) => Some(&mut **sink),
            SpecialArg::Input(_) => None,
        })
    }

    pub fn args(&self) -> &'a [Value] {
        self.values
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    pub fn arg_str(&self, index: usize) -> Option<&'a str> {
        self.arg(index).and_then(Value::as_str)
    }

    /// Reads argument `index` as an integer, parsing strings.
    pub fn arg_i64(&self, index: usize) -> anyhow::Result<i64> {
        match self.arg(index) {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("argument {} is not an integer: {}", index, n)),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("argument {} is not an integer: {}", index, s)),
            Some(other) => anyhow::bail!("argument {} is not an integer: {}", index, other),
            None => anyhow::bail!("missing argument {}", index),
        }
    }

    /// Reads argument `index` as a list of strings.
    pub fn arg_list(&self, index: usize) -> Vec<String> {
        match self.arg(index) {
            Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![value_to_string(other)],
        }
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub fn option(&self, name: &str) -> Option<&'a Value> {
        self.options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&'a str> {
        self.option(name).and_then(Value::as_str)
    }

    /// True when option `name` is `true` or a non-empty string.
    pub fn option_bool(&self, name: &str) -> bool {
        match self.option(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            _ => false,
        }
    }
}

/// The callable bound to a command.
///
/// Implemented for every `Fn(&mut Invocation) -> anyhow::Result<CommandResult>`.
pub trait CommandCallback {
    fn call(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<CommandResult>;
}

impl<F> CommandCallback for F
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<CommandResult>,
{
    fn call(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<CommandResult> {
        self(invocation)
    }
}

/// Plain text of a JSON value: strings unquoted, null empty.
pub(crate) fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
