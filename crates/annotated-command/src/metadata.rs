//! Resolved command descriptions.
//!
//! A [`CommandMetadata`] is everything the pipeline knows about one command:
//! its name and aliases, help text, argument and option definitions, and the
//! raw [`AnnotationData`] the command author attached. Metadata is built
//! explicitly at registration time through [`CommandMetadataBuilder`]; nothing
//! in the pipeline inspects types or source code at run time.
//!
//! # Naming
//!
//! Unless a `command` annotation names the command explicitly, the name is
//! derived from the method name: camelCase boundaries and underscores become
//! colons (`testArithmatic` and `test_arithmatic` both become
//! `test:arithmatic`).

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::annotation::{AnnotationData, AnnotationValue};

/// Errors raised while building command metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("command '{command}' declares '{name}' more than once")]
    DuplicateName { command: String, name: String },

    #[error("boolean option '{option}' of command '{command}' must default to true or false")]
    InvalidFlagDefault { command: String, option: String },

    #[error("command '{command}' uses shortcut '-{shortcut}' for '{option}', which is already taken")]
    DuplicateShortcut {
        command: String,
        option: String,
        shortcut: char,
    },

    #[error("command name must not be empty")]
    EmptyName,
}

/// Shortcuts clap claims for every command.
pub const RESERVED_SHORTCUTS: &[char] = &['h'];

/// Pipeline-provided values a callback asks to receive ahead of its own
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialParameter {
    /// The parsed input of the current invocation
    Input,
    /// The output sink of the current invocation
    Output,
}

/// A positional argument definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentDef {
    pub name: String,
    pub description: String,
    /// Default value; `None` means the argument is required
    pub default: Option<Value>,
    /// Collects every remaining positional value (and pass-through tokens)
    pub is_array: bool,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default: None,
            is_array: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the argument as array-typed. Array arguments default to `[]`.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        if self.default.is_none() {
            self.default = Some(Value::Array(Vec::new()));
        }
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// How an option takes values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionKind {
    /// Boolean switch; present means `true`
    Flag,
    /// Takes one value
    Value,
    /// May be repeated; collects a list
    List,
}

/// An option definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDef {
    pub name: String,
    pub shortcut: Option<char>,
    pub description: String,
    pub kind: OptionKind,
    pub default: Value,
}

impl OptionDef {
    /// A boolean flag defaulting to `false`. `spec` is `name` or `name|s`.
    pub fn flag(spec: &str) -> Self {
        Self::from_spec(spec, OptionKind::Flag, Value::Bool(false))
    }

    /// A single-value option. `spec` is `name` or `name|s`.
    pub fn value(spec: &str, default: impl Into<Value>) -> Self {
        Self::from_spec(spec, OptionKind::Value, default.into())
    }

    /// A repeatable option collecting a list. `spec` is `name` or `name|s`.
    pub fn list(spec: &str) -> Self {
        Self::from_spec(spec, OptionKind::List, Value::Array(Vec::new()))
    }

    fn from_spec(spec: &str, kind: OptionKind, default: Value) -> Self {
        let (name, shortcut) = match spec.split_once('|') {
            Some((name, short)) => (name, short.trim().chars().next()),
            None => (spec, None),
        };
        Self {
            name: name.trim().trim_start_matches("--").to_string(),
            shortcut,
            description: String::new(),
            kind,
            default,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == OptionKind::Flag
    }

    /// Drops the shortcut when it is reserved or used by one of `taken`.
    pub(crate) fn fit_shortcut(mut self, taken: &[OptionDef]) -> Self {
        if let Some(short) = self.shortcut {
            if RESERVED_SHORTCUTS.contains(&short) || taken.iter().any(|o| o.shortcut == Some(short)) {
                tracing::debug!(option = %self.name, shortcut = %short, "dropping taken shortcut");
                self.shortcut = None;
            }
        }
        self
    }
}

/// The resolved description of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandMetadata {
    method_name: String,
    name: String,
    aliases: Vec<String>,
    description: String,
    help: String,
    hidden: bool,
    arguments: Vec<ArgumentDef>,
    options: Vec<OptionDef>,
    usage_examples: Vec<(String, String)>,
    return_type: Option<String>,
    special_parameters: Vec<SpecialParameter>,
    annotations: AnnotationData,
}

impl CommandMetadata {
    /// Starts building metadata for the method `method_name`.
    pub fn builder(method_name: impl Into<String>) -> CommandMetadataBuilder {
        CommandMetadataBuilder::new(method_name)
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The command name followed by its aliases.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(self.aliases.iter().cloned())
            .collect()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn arguments(&self) -> &[ArgumentDef] {
        &self.arguments
    }

    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&OptionDef> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn usage_examples(&self) -> &[(String, String)] {
        &self.usage_examples
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    pub fn special_parameters(&self) -> &[SpecialParameter] {
        &self.special_parameters
    }

    pub fn annotations(&self) -> &AnnotationData {
        &self.annotations
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations.has(key)
    }

    pub fn annotation(&self, key: &str) -> Option<String> {
        self.annotations.value(key).map(AnnotationValue::to_scalar)
    }

    /// Merges options and annotations contributed by hook methods during
    /// registration. Options this command already defines are kept; the
    /// command's own annotations win over contributed ones.
    pub fn absorb(&mut self, options: &[OptionDef], annotations: &AnnotationData) {
        for option in options {
            if self.is_declared(&option.name) {
                tracing::trace!(
                    command = %self.name,
                    option = %option.name,
                    "contributed option already declared"
                );
                continue;
            }
            let option = option.clone().fit_shortcut(&self.options);
            self.options.push(option);
        }
        self.annotations.extend_missing(annotations);
    }

    fn is_declared(&self, name: &str) -> bool {
        self.arguments.iter().any(|a| a.name == name) || self.options.iter().any(|o| o.name == name)
    }
}

/// Builder for [`CommandMetadata`].
#[derive(Debug, Clone)]
pub struct CommandMetadataBuilder {
    method_name: String,
    aliases: Vec<String>,
    description: String,
    help: String,
    arguments: Vec<ArgumentDef>,
    options: Vec<OptionDef>,
    usage_examples: Vec<(String, String)>,
    return_type: Option<String>,
    special_parameters: Vec<SpecialParameter>,
    annotations: AnnotationData,
}

impl CommandMetadataBuilder {
    fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            aliases: Vec::new(),
            description: String::new(),
            help: String::new(),
            arguments: Vec::new(),
            options: Vec::new(),
            usage_examples: Vec::new(),
            return_type: None,
            special_parameters: Vec::new(),
            annotations: AnnotationData::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn option(mut self, option: OptionDef) -> Self {
        self.options.push(option);
        self
    }

    pub fn usage(mut self, example: impl Into<String>, description: impl Into<String>) -> Self {
        self.usage_examples.push((example.into(), description.into()));
        self
    }

    pub fn return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Requests a special parameter. Special parameters are passed to the
    /// callback in the order they are requested.
    pub fn special(mut self, parameter: SpecialParameter) -> Self {
        self.special_parameters.push(parameter);
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        self.annotations.set(key, value);
        self
    }

    pub fn annotations(mut self, annotations: AnnotationData) -> Self {
        for (key, value) in annotations.iter() {
            self.annotations.set(key, value.clone());
        }
        self
    }

    /// Resolves the name and aliases and checks the definitions.
    pub fn build(self) -> Result<CommandMetadata, MetadataError> {
        let name = match self.annotations.value("command") {
            Some(value) if !value.to_scalar().trim().is_empty() => value.to_scalar().trim().to_string(),
            _ => command_name_from_method(&self.method_name),
        };
        if name.is_empty() {
            return Err(MetadataError::EmptyName);
        }

        let mut aliases = Vec::new();
        for alias in self
            .aliases
            .into_iter()
            .chain(self.annotations.get_list("aliases"))
        {
            if alias != name && !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        let mut seen = HashSet::new();
        let declared = self
            .arguments
            .iter()
            .map(|a| &a.name)
            .chain(self.options.iter().map(|o| &o.name));
        for declared_name in declared {
            if !seen.insert(declared_name.as_str()) {
                return Err(MetadataError::DuplicateName {
                    command: name,
                    name: declared_name.clone(),
                });
            }
        }

        let mut shortcuts: HashSet<char> = RESERVED_SHORTCUTS.iter().copied().collect();
        for option in &self.options {
            if let Some(short) = option.shortcut {
                if !shortcuts.insert(short) {
                    return Err(MetadataError::DuplicateShortcut {
                        command: name,
                        option: option.name.clone(),
                        shortcut: short,
                    });
                }
            }
        }

        if let Some(bad) = self
            .options
            .iter()
            .find(|o| o.is_boolean() && !o.default.is_boolean())
        {
            return Err(MetadataError::InvalidFlagDefault {
                command: name,
                option: bad.name.clone(),
            });
        }

        let hidden = self.annotations.flag("hidden");

        Ok(CommandMetadata {
            method_name: self.method_name,
            name,
            aliases,
            description: self.description,
            help: self.help,
            hidden,
            arguments: self.arguments,
            options: self.options,
            usage_examples: self.usage_examples,
            return_type: self.return_type,
            special_parameters: self.special_parameters,
            annotations: self.annotations,
        })
    }
}

/// Derives a command name from a method name.
///
/// A lower-case letter or digit followed by an upper-case letter starts a
/// new colon-delimited token, and underscores become colons.
pub fn command_name_from_method(method: &str) -> String {
    let mut name = String::with_capacity(method.len() + 4);
    let mut prev_lower = false;

    for c in method.chars() {
        if c == '_' {
            if !name.is_empty() && !name.ends_with(':') {
                name.push(':');
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() {
            if prev_lower {
                name.push(':');
            }
            name.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            name.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }

    name.trim_end_matches(':').to_string()
}
