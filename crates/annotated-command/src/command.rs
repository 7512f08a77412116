//! Binding metadata and callbacks to clap commands.
//!
//! An [`AnnotatedCommand`] pairs a [`CommandMetadata`] with its callback and
//! the shared [`CommandProcessor`]. It builds the clap definition, turns
//! parsed matches into a [`CommandInput`], runs the command-event,
//! initialize and interact hooks, and hands the invocation to the processor.
//!
//! # Pass-through arguments
//!
//! Tokens after a `--` separator are appended to the last argument: merged
//! into it when it is an array argument, space-joined onto it otherwise.
//!
//! ```text
//! cat a b c -- x y z     # files = [a, b, c, x, y, z]
//! ```

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::hooks::HookDispatcher;
use crate::input::{value_to_string, CommandCallback, CommandData, CommandInput};
use crate::metadata::{CommandMetadata, OptionDef, OptionKind};
use crate::output::OutputSink;
use crate::processor::CommandProcessor;
use crate::result::{CommandError, CommandResult};

/// clap id of the hidden argument collecting tokens after `--`.
const PASSTHROUGH_ID: &str = "__passthrough";

/// A command ready to be registered with clap and run.
#[derive(Clone)]
pub struct AnnotatedCommand {
    metadata: CommandMetadata,
    callback: Rc<dyn CommandCallback>,
    processor: Rc<CommandProcessor>,
    scopes: Vec<String>,
}

impl AnnotatedCommand {
    pub fn new(
        metadata: CommandMetadata,
        callback: Rc<dyn CommandCallback>,
        processor: Rc<CommandProcessor>,
    ) -> Self {
        let scopes = metadata.names();
        Self {
            metadata,
            callback,
            processor,
            scopes,
        }
    }

    /// Also resolves hooks registered for the command file `identity`.
    pub fn in_command_file(mut self, identity: impl Into<String>) -> Self {
        let identity = identity.into();
        if !identity.is_empty() && !self.scopes.contains(&identity) {
            self.scopes.push(identity);
        }
        self
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    /// Hook scopes: name, aliases, then the command-file identity.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether `name` is this command's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.metadata.name() == name || self.metadata.aliases().iter().any(|a| a == name)
    }

    fn dispatcher(&self) -> HookDispatcher<'_> {
        self.processor.dispatcher(&self.scopes)
    }

    /// Every option of the command: its own, those contributed by option
    /// hooks, and `--format`/`--pipe`/`--fields` when the processor adds them.
    pub fn options(&self) -> Vec<OptionDef> {
        let mut options = self.metadata.options().to_vec();
        let declared = |options: &[OptionDef], name: &str| {
            options.iter().any(|o| o.name == name)
                || self.metadata.arguments().iter().any(|a| a.name == name)
        };

        for option in self.dispatcher().options(&self.metadata) {
            if declared(&options, &option.name) {
                tracing::trace!(command = %self.name(), option = %option.name, "hook option already declared");
                continue;
            }
            let option = option.fit_shortcut(&options);
            options.push(option);
        }

        if self.processor.config().format_options {
            let default_format = self
                .metadata
                .annotations()
                .get("default-format", &self.processor.config().default_format);
            for option in [
                OptionDef::value("format", "")
                    .description(format!("Format the result data [default: {}]", default_format)),
                OptionDef::flag("pipe").description("Format the result for piping"),
                OptionDef::value("fields", "").description("Comma separated fields to keep"),
            ] {
                if !declared(&options, &option.name) {
                    options.push(option);
                }
            }
        }
        options
    }

    /// The clap definition of this command.
    pub fn definition(&self) -> Command {
        let metadata = &self.metadata;
        let mut cmd = Command::new(metadata.name().to_string())
            .aliases(metadata.aliases().to_vec())
            .hide(metadata.is_hidden());
        if !metadata.description().is_empty() {
            cmd = cmd.about(metadata.description().to_string());
        }
        if !metadata.help().is_empty() {
            cmd = cmd.long_about(metadata.help().to_string());
        }
        if !metadata.usage_examples().is_empty() {
            let mut examples = String::from("Examples:");
            for (example, description) in metadata.usage_examples() {
                examples.push_str(&format!("\n  {}\n      {}", example, description));
            }
            cmd = cmd.after_help(examples);
        }

        for argument in metadata.arguments() {
            let mut arg = Arg::new(argument.name.clone())
                .value_name(argument.name.to_uppercase())
                .required(argument.is_required());
            if argument.is_array {
                arg = arg.num_args(1..).action(ArgAction::Append);
            }
            if !argument.description.is_empty() {
                arg = arg.help(argument.description.clone());
            }
            cmd = cmd.arg(arg);
        }

        for option in self.options() {
            cmd = cmd.arg(option_arg(&option));
        }

        cmd.arg(
            Arg::new(PASSTHROUGH_ID)
                .num_args(0..)
                .action(ArgAction::Append)
                .last(true)
                .hide(true),
        )
    }

    /// Builds the command input from parsed matches, filling defaults and
    /// merging pass-through tokens.
    pub fn input_from_matches(&self, matches: &ArgMatches) -> CommandInput {
        let mut input = CommandInput::new(self.name());

        for argument in self.metadata.arguments() {
            let parsed = if argument.is_array {
                matches
                    .get_many::<String>(&argument.name)
                    .map(|values| Value::Array(values.cloned().map(Value::String).collect()))
            } else {
                matches
                    .get_one::<String>(&argument.name)
                    .cloned()
                    .map(Value::String)
            };
            let value = parsed
                .or_else(|| argument.default.clone())
                .unwrap_or(Value::Null);
            input.set_argument(argument.name.clone(), value);
        }

        for option in self.options() {
            input.set_option(option.name.clone(), option_value(matches, &option));
        }

        let passthrough: Vec<String> = matches
            .get_many::<String>(PASSTHROUGH_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if !passthrough.is_empty() {
            self.merge_passthrough(&mut input, &passthrough);
            input.set_passthrough(passthrough);
        }
        input
    }

    fn merge_passthrough(&self, input: &mut CommandInput, tokens: &[String]) {
        let Some(last) = self.metadata.arguments().last() else {
            tracing::debug!(command = %self.name(), "no argument to receive pass-through tokens");
            return;
        };
        let merged = match input.argument(&last.name) {
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                items.extend(tokens.iter().cloned().map(Value::String));
                Value::Array(items)
            }
            Some(Value::Null) | None if last.is_array => {
                Value::Array(tokens.iter().cloned().map(Value::String).collect())
            }
            existing => {
                let existing = existing.map(value_to_string).unwrap_or_default();
                let joined = tokens.join(" ");
                if existing.is_empty() {
                    Value::String(joined)
                } else {
                    Value::String(format!("{} {}", existing, joined))
                }
            }
        };
        input.set_argument(last.name.clone(), merged);
    }

    /// Runs the command for parsed `matches`.
    pub fn run(&self, matches: &ArgMatches, output: &mut dyn OutputSink) -> i32 {
        let input = self.input_from_matches(matches);
        self.execute(input, output)
    }

    /// Parses `args` (the first item is the command name) and runs the
    /// command. Returns the clap error if parsing fails.
    pub fn run_from<I, T>(&self, args: I, output: &mut dyn OutputSink) -> Result<i32, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = self.definition().try_get_matches_from(args)?;
        Ok(self.run(&matches, output))
    }

    /// Runs the pre-validation hooks and the processor for `input`.
    ///
    /// A failing command-event, initialize or interact hook ends the
    /// invocation with an error-result.
    pub fn execute(&self, mut input: CommandInput, output: &mut dyn OutputSink) -> i32 {
        let annotations = self.metadata.annotations();

        if let Err(err) = self.prepare(&mut input, output) {
            tracing::debug!(command = %self.name(), error = %err, "command aborted before validation");
            let data = CommandData::new(annotations.clone(), input);
            let result = CommandResult::Error(CommandError::from_error(&err));
            return self
                .processor
                .handle_results(output, &self.scopes, result, &data);
        }

        let mut data = CommandData::new(annotations.clone(), input)
            .with_special_parameters(self.metadata.special_parameters().to_vec());
        self.processor
            .process(output, &self.scopes, self.callback.as_ref(), &mut data)
    }

    fn prepare(&self, input: &mut CommandInput, output: &mut dyn OutputSink) -> anyhow::Result<()> {
        let dispatcher = self.dispatcher();
        let annotations = self.metadata.annotations();
        dispatcher.command_event(input, annotations)?;
        dispatcher.initialize(input, annotations)?;
        dispatcher.interact(input, output, annotations)
    }
}

impl fmt::Debug for AnnotatedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedCommand")
            .field("name", &self.metadata.name())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

fn option_arg(option: &OptionDef) -> Arg {
    let mut arg = Arg::new(option.name.clone()).long(option.name.clone());
    if let Some(short) = option.shortcut {
        arg = arg.short(short);
    }
    if !option.description.is_empty() {
        arg = arg.help(option.description.clone());
    }
    match option.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Value => arg
            .action(ArgAction::Set)
            .value_name(option.name.to_uppercase()),
        OptionKind::List => arg
            .action(ArgAction::Append)
            .value_name(option.name.to_uppercase()),
    }
}

fn option_value(matches: &ArgMatches, option: &OptionDef) -> Value {
    match option.kind {
        OptionKind::Flag => {
            if matches.get_flag(&option.name) {
                Value::Bool(true)
            } else {
                option.default.clone()
            }
        }
        OptionKind::Value => matches
            .get_one::<String>(&option.name)
            .cloned()
            .map(Value::String)
            .unwrap_or_else(|| option.default.clone()),
        OptionKind::List => matches
            .get_many::<String>(&option.name)
            .map(|values| Value::Array(values.cloned().map(Value::String).collect()))
            .unwrap_or_else(|| option.default.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Hook, HookKind, HookManager};
    use crate::input::Invocation;
    use crate::metadata::ArgumentDef;
    use crate::output::BufferedOutput;
    use serde_json::json;
    use std::cell::RefCell;

    fn echo_args() -> Rc<dyn CommandCallback> {
        Rc::new(|inv: &mut Invocation<'_>| -> anyhow::Result<CommandResult> {
            Ok(CommandResult::data(Value::Array(inv.args().to_vec())))
        })
    }

    fn command(metadata: CommandMetadata, hooks: HookManager) -> AnnotatedCommand {
        let processor = Rc::new(CommandProcessor::new(hooks));
        AnnotatedCommand::new(metadata, echo_args(), processor)
    }

    fn cat_metadata() -> CommandMetadata {
        CommandMetadata::builder("cat")
            .argument(ArgumentDef::new("files").array())
            .build()
            .unwrap()
    }

    #[test]
    fn test_definition_has_arguments_and_options() {
        let metadata = CommandMetadata::builder("testArithmatic")
            .description("Add two numbers")
            .argument(ArgumentDef::new("one"))
            .argument(ArgumentDef::new("two").default_value("2"))
            .option(OptionDef::flag("negate|n"))
            .alias("arith")
            .build()
            .unwrap();
        let cmd = command(metadata, HookManager::new()).definition();

        assert_eq!(cmd.get_name(), "test:arithmatic");
        assert!(cmd.get_all_aliases().any(|a| a == "arith"));
        let ids: Vec<&str> = cmd.get_arguments().map(|a| a.get_id().as_str()).collect();
        assert!(ids.contains(&"one"));
        assert!(ids.contains(&"negate"));
        assert!(ids.contains(&"format"));
        assert!(ids.contains(&"pipe"));
        assert!(ids.contains(&"fields"));
    }

    #[test]
    fn test_input_fills_defaults() {
        let metadata = CommandMetadata::builder("greet")
            .argument(ArgumentDef::new("who").default_value("World"))
            .option(OptionDef::value("greeting", "Hello"))
            .build()
            .unwrap();
        let cmd = command(metadata, HookManager::new());
        let matches = cmd.definition().try_get_matches_from(["greet"]).unwrap();
        let input = cmd.input_from_matches(&matches);

        assert_eq!(input.argument("who"), Some(&json!("World")));
        assert_eq!(input.option("greeting"), Some(&json!("Hello")));
        assert_eq!(input.option("pipe"), Some(&json!(false)));
        // Empty means not given; the processor falls back to --pipe or the default
        assert_eq!(input.option("format"), Some(&json!("")));
    }

    #[test]
    fn test_passthrough_merges_into_array_argument() {
        let cmd = command(cat_metadata(), HookManager::new());
        let matches = cmd
            .definition()
            .try_get_matches_from(["cat", "a", "b", "c", "--", "x", "y", "z"])
            .unwrap();
        let input = cmd.input_from_matches(&matches);

        assert_eq!(input.argument("files"), Some(&json!(["a", "b", "c", "x", "y", "z"])));
        assert_eq!(input.passthrough(), &["x", "y", "z"]);
    }

    #[test]
    fn test_passthrough_joins_scalar_argument() {
        let metadata = CommandMetadata::builder("run")
            .argument(ArgumentDef::new("program"))
            .build()
            .unwrap();
        let cmd = command(metadata, HookManager::new());
        let matches = cmd
            .definition()
            .try_get_matches_from(["run", "ls", "--", "-la", "/tmp"])
            .unwrap();
        let input = cmd.input_from_matches(&matches);

        assert_eq!(input.argument("program"), Some(&json!("ls -la /tmp")));
    }

    #[test]
    fn test_option_hook_adds_option() {
        let mut hooks = HookManager::new();
        hooks.add(
            Hook::options(|_| vec![OptionDef::flag("dry-run")]),
            HookKind::Option,
            "cat",
        );
        let cmd = command(cat_metadata(), hooks);
        let matches = cmd
            .definition()
            .try_get_matches_from(["cat", "f", "--dry-run"])
            .unwrap();
        let input = cmd.input_from_matches(&matches);
        assert_eq!(input.option("dry-run"), Some(&json!(true)));
    }

    #[test]
    fn test_option_hook_shortcut_collision_is_stripped() {
        let mut hooks = HookManager::new();
        hooks.add(
            Hook::options(|_| vec![OptionDef::flag("human|h"), OptionDef::flag("all|a")]),
            HookKind::Option,
            "list",
        );
        let metadata = CommandMetadata::builder("list")
            .option(OptionDef::flag("almost|a"))
            .build()
            .unwrap();
        let cmd = command(metadata, hooks);
        let options = cmd.options();
        let shortcut = |name: &str| options.iter().find(|o| o.name == name).and_then(|o| o.shortcut);
        assert_eq!(shortcut("human"), None);
        assert_eq!(shortcut("all"), None);
        assert_eq!(shortcut("almost"), Some('a'));

        let mut out = BufferedOutput::new();
        let status = cmd.run_from(["list", "--human", "-a", "--format", "json"], &mut out).unwrap();
        assert_eq!(status, 0);
    }

    #[test]
    fn test_format_options_can_be_disabled() {
        let processor = Rc::new(CommandProcessor::builder().format_options(false).build());
        let cmd = AnnotatedCommand::new(cat_metadata(), echo_args(), processor);
        assert!(cmd.options().is_empty());
    }

    #[test]
    fn test_run_passes_positional_arguments() {
        let cmd = command(cat_metadata(), HookManager::new());
        let mut out = BufferedOutput::new();
        let status = cmd
            .run_from(["cat", "a", "b", "--format", "json"], &mut out)
            .unwrap();
        assert_eq!(status, 0);
        assert_eq!(out.contents(), "[\n  [\n    \"a\",\n    \"b\"\n  ]\n]\n");
    }

    #[test]
    fn test_hooks_run_before_validation_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = HookManager::new();
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        hooks.add_global(
            Hook::validate(move |_| {
                a.borrow_mut().push("validate");
                Ok(None)
            }),
            HookKind::Validate,
        );
        hooks.add_global(
            Hook::interact(move |_, _, _| {
                b.borrow_mut().push("interact");
                Ok(())
            }),
            HookKind::Interact,
        );
        hooks.add_global(
            Hook::initialize(move |_, _| {
                c.borrow_mut().push("initialize");
                Ok(())
            }),
            HookKind::Initialize,
        );
        hooks.add_global(
            Hook::command_event(move |_, _| {
                d.borrow_mut().push("command-event");
                Ok(())
            }),
            HookKind::CommandEvent,
        );
        let cmd = command(cat_metadata(), hooks);
        let mut out = BufferedOutput::new();
        cmd.run_from(["cat", "a"], &mut out).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["command-event", "initialize", "interact", "validate"]
        );
    }

    #[test]
    fn test_command_event_error_aborts() {
        let mut hooks = HookManager::new();
        hooks.add(
            Hook::command_event(|_, _| anyhow::bail!("not today")),
            HookKind::CommandEvent,
            "cat",
        );
        let cmd = command(cat_metadata(), hooks);
        let mut out = BufferedOutput::with_error_channel();
        let status = cmd.run_from(["cat", "a"], &mut out).unwrap();
        assert_eq!(status, 1);
        assert_eq!(out.contents(), "");
        assert_eq!(out.error_contents(), "not today\n");
    }

    #[test]
    fn test_command_file_scope_resolves_hooks() {
        let mut hooks = HookManager::new();
        hooks.add(
            Hook::alter(|_, _| Ok(Some(CommandResult::text("from file hook")))),
            HookKind::Alter,
            "MyCommands",
        );
        let cmd = command(cat_metadata(), hooks).in_command_file("MyCommands");
        assert_eq!(cmd.scopes(), &["cat", "MyCommands"]);

        let mut out = BufferedOutput::new();
        cmd.run_from(["cat", "a"], &mut out).unwrap();
        assert_eq!(out.contents(), "from file hook\n");
    }
}
