//! End-to-end tests of the command pipeline through registered command files.

use annotated_command::{
    AnnotatedCommand, ArgumentDef, BufferedOutput, CommandData, CommandError, CommandFactory,
    CommandFile, CommandMetadata, CommandResult, Hook, HookKind, OptionDef, SpecialParameter,
    WILDCARD,
};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// Fixtures
// ============================================================================

fn example_file(hello_calls: Rc<Cell<usize>>) -> CommandFile {
    CommandFile::new("ExampleCommandFile")
        .command(
            CommandMetadata::builder("testArithmatic")
                .description("Add two numbers together")
                .argument(ArgumentDef::new("one").description("The first number"))
                .argument(ArgumentDef::new("two").default_value("2"))
                .option(OptionDef::flag("negate").description("Whether or not the result should be negated")),
            |inv| {
                let sum = inv.arg_i64(0)? + inv.arg_i64(1)?;
                let sum = if inv.option_bool("negate") { -sum } else { sum };
                Ok(CommandResult::text(sum.to_string()))
            },
        )
        .command(
            CommandMetadata::builder("testHook").argument(ArgumentDef::new("parameter")),
            |inv| {
                Ok(CommandResult::text(format!(
                    "[{}]",
                    inv.arg_str(0).unwrap_or_default()
                )))
            },
        )
        .hook(
            CommandMetadata::builder("hookTestHook").annotation("hook", "alter test:hook"),
            Hook::alter(|result, _| {
                Ok(Some(CommandResult::text(format!(
                    "<{}>",
                    result.as_text().unwrap_or_default()
                ))))
            }),
        )
        .command(
            CommandMetadata::builder("testHello").argument(ArgumentDef::new("who").default_value("Hermione")),
            move |inv| {
                hello_calls.set(hello_calls.get() + 1);
                Ok(CommandResult::text(format!(
                    "Hello, {}.",
                    inv.arg_str(0).unwrap_or_default()
                )))
            },
        )
        .hook(
            CommandMetadata::builder("validateTestHello").annotation("hook", "validate test:hello"),
            Hook::validate(|data| {
                if data.input().argument("who") == Some(&json!("Donald Duck")) {
                    return Err(CommandError::new("I won't say hello to Donald Duck.").into());
                }
                Ok(None)
            }),
        )
        .command(
            CommandMetadata::builder("cat")
                .argument(ArgumentDef::new("files").array()),
            |inv| Ok(CommandResult::data(json!({ "files": inv.arg_list(0) }))),
        )
}

struct Fixture {
    commands: Vec<AnnotatedCommand>,
    hello_calls: Rc<Cell<usize>>,
}

impl Fixture {
    fn new() -> Self {
        let hello_calls = Rc::new(Cell::new(0));
        let mut factory = CommandFactory::new();
        factory
            .register_command_file(example_file(hello_calls.clone()))
            .unwrap();
        Self {
            commands: factory.build().unwrap(),
            hello_calls,
        }
    }

    fn command(&self, name: &str) -> &AnnotatedCommand {
        self.commands
            .iter()
            .find(|c| c.answers_to(name))
            .unwrap_or_else(|| panic!("no command named {}", name))
    }

    fn run(&self, args: &[&str]) -> (i32, BufferedOutput) {
        let mut out = BufferedOutput::with_error_channel();
        let status = self
            .command(args[0])
            .run_from(args.iter().copied(), &mut out)
            .unwrap();
        (status, out)
    }
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_arithmatic_negated() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:arithmatic", "2", "3", "--negate"]);
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "-5\n");
    assert_eq!(out.error_contents(), "");
}

#[test]
fn test_arithmatic_uses_argument_default() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:arithmatic", "40"]);
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "42\n");
}

#[test]
fn test_arithmatic_bad_number_is_error_result() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:arithmatic", "two", "3"]);
    assert_eq!(status, 1);
    assert_eq!(out.contents(), "");
    assert_eq!(out.error_contents(), "argument 0 is not an integer: two\n");
}

#[test]
fn test_alter_hook_wraps_result() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:hook", "bar"]);
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "<[bar]>\n");
}

#[test]
fn test_validator_stops_donald_duck() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:hello", "Donald Duck"]);
    assert_eq!(status, 1);
    assert_eq!(out.contents(), "");
    assert_eq!(out.error_contents(), "I won't say hello to Donald Duck.\n");
    assert_eq!(fixture.hello_calls.get(), 0);
}

#[test]
fn test_validator_lets_others_through() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["test:hello"]);
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "Hello, Hermione.\n");
    assert_eq!(fixture.hello_calls.get(), 1);
}

#[test]
fn test_passthrough_extends_array_argument() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&[
        "cat", "a", "b", "c", "--format", "json", "--", "x", "y", "z",
    ]);
    assert_eq!(status, 0);
    let parsed: Value = serde_json::from_str(out.contents()).unwrap();
    assert_eq!(
        parsed,
        json!({ "files": ["a", "b", "c", "x", "y", "z"] })
    );
}

#[test]
fn test_structured_result_with_format_option() {
    let fixture = Fixture::new();
    let (status, out) = fixture.run(&["cat", "a", "b", "--format", "yaml"]);
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "files:\n- a\n- b\n");
}

// ============================================================================
// Hook composition
// ============================================================================

fn single_command(callback_result: CommandResult) -> (CommandFactory, CommandFile) {
    let file = CommandFile::new("Solo").command(CommandMetadata::builder("solo"), move |_| {
        Ok(callback_result.clone())
    });
    (CommandFactory::new(), file)
}

fn run_solo(factory: CommandFactory, file: CommandFile) -> (i32, BufferedOutput) {
    let mut factory = factory;
    factory.register_command_file(file).unwrap();
    let commands = factory.build().unwrap();
    let mut out = BufferedOutput::with_error_channel();
    let status = commands[0].run_from(["solo"], &mut out).unwrap();
    (status, out)
}

#[test]
fn test_processor_returning_nothing_keeps_previous_result() {
    let (mut factory, file) = single_command(CommandResult::text("original"));
    factory.hooks_mut().add(
        Hook::process(|_, _| Ok(Some(CommandResult::text("first")))),
        HookKind::Process,
        "solo",
    );
    factory
        .hooks_mut()
        .add(Hook::process(|_, _| Ok(None)), HookKind::Process, "solo");
    let (_, out) = run_solo(factory, file);
    assert_eq!(out.contents(), "first\n");
}

#[test]
fn test_explicit_exit_code_wins_over_determiner() {
    let (mut factory, file) = single_command(CommandResult::with_exit_code("done", 5));
    factory
        .hooks_mut()
        .add_global(Hook::status(|_| Some(99)), HookKind::Status);
    let (status, out) = run_solo(factory, file);
    assert_eq!(status, 5);
    assert_eq!(out.error_contents(), "done\n");
}

#[test]
fn test_bare_integer_is_exit_code() {
    let (factory, file) = single_command(CommandResult::Integer(7));
    let (status, out) = run_solo(factory, file);
    assert_eq!(status, 7);
    assert_eq!(out.contents(), "");
    assert_eq!(out.error_contents(), "");
}

#[test]
fn test_wildcard_and_file_scopes_compose() {
    let (mut factory, file) = single_command(CommandResult::text("x"));
    let wrap = |tag: &'static str| {
        Hook::alter(move |result, _| {
            Ok(Some(CommandResult::text(format!(
                "{}({})",
                tag,
                result.as_text().unwrap_or_default()
            ))))
        })
    };
    factory.hooks_mut().add(wrap("star"), HookKind::Alter, WILDCARD);
    factory.hooks_mut().add(wrap("file"), HookKind::Alter, "Solo");
    factory.hooks_mut().add(wrap("pre"), HookKind::PreAlter, WILDCARD);
    factory.hooks_mut().add(wrap("name"), HookKind::Alter, "solo");
    let (_, out) = run_solo(factory, file);
    assert_eq!(out.contents(), "star(file(name(pre(x))))\n");
}

#[test]
fn test_special_parameters_come_first() {
    let file = CommandFile::new("Special").command(
        CommandMetadata::builder("whoami")
            .special(SpecialParameter::Input)
            .special(SpecialParameter::Output)
            .argument(ArgumentDef::new("name")),
        |inv| {
            let command = inv.input().map(|i| i.command().to_string()).unwrap_or_default();
            let name = inv.arg_str(0).unwrap_or_default().to_string();
            if let Some(out) = inv.output() {
                out.write_line(&format!("running {}", command))?;
            }
            Ok(CommandResult::text(name))
        },
    );
    let mut factory = CommandFactory::new();
    factory.register_command_file(file).unwrap();
    let commands = factory.build().unwrap();
    let mut out = BufferedOutput::new();
    let status = commands[0].run_from(["whoami", "ada"], &mut out).unwrap();
    assert_eq!(status, 0);
    assert_eq!(out.contents(), "running whoami\nada\n");
}

#[test]
fn test_validator_can_rewrite_arguments() {
    let file = CommandFile::new("Rewrite")
        .command(
            CommandMetadata::builder("shout").argument(ArgumentDef::new("word")),
            |inv| Ok(CommandResult::text(inv.arg_str(0).unwrap_or_default().to_string())),
        )
        .hook(
            CommandMetadata::builder("upper").annotation("hook", "pre-validate shout"),
            Hook::validate(|data: &CommandData| {
                let mut args = data.args().clone();
                if let Some(Value::String(word)) = args.values.first_mut() {
                    *word = word.to_uppercase();
                }
                Ok(Some(args))
            }),
        );
    let mut factory = CommandFactory::new();
    factory.register_command_file(file).unwrap();
    let commands = factory.build().unwrap();
    let mut out = BufferedOutput::new();
    commands[0].run_from(["shout", "hey"], &mut out).unwrap();
    assert_eq!(out.contents(), "HEY\n");
}
