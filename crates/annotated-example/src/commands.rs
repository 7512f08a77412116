//! The reference command file.

use annotated_command::{
    Application, ArgumentDef, CommandError, CommandFactory, CommandFile, CommandMetadata,
    CommandResult, Hook, OptionDef, RegistrationError, SpecialParameter,
};
use serde_json::json;

/// Identity of the command file; hooks can target it as a scope.
pub const COMMAND_FILE: &str = "ExampleCommandFile";

pub fn example_commands() -> CommandFile {
    CommandFile::new(COMMAND_FILE)
        .command(
            CommandMetadata::builder("testArithmatic")
                .description("Add two numbers together")
                .argument(ArgumentDef::new("one").description("The first number to add"))
                .argument(
                    ArgumentDef::new("two")
                        .description("The other number to add")
                        .default_value("2"),
                )
                .option(OptionDef::flag("negate").description("Negate the result"))
                .usage("test:arithmatic 2 3 --negate", "Prints -5"),
            |inv| {
                let sum = inv.arg_i64(0)? + inv.arg_i64(1)?;
                let sum = if inv.option_bool("negate") { -sum } else { sum };
                Ok(CommandResult::text(sum.to_string()))
            },
        )
        .command(
            CommandMetadata::builder("testHook")
                .description("Wraps its parameter; an alter hook wraps it again")
                .argument(ArgumentDef::new("parameter")),
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
            CommandMetadata::builder("testHello")
                .description("Say hello")
                .argument(ArgumentDef::new("who").default_value("World"))
                .alias("hello"),
            |inv| {
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
            CommandMetadata::builder("testEcho")
                .description("Echo arguments, including those after --")
                .argument(ArgumentDef::new("words").array()),
            |inv| Ok(CommandResult::text(inv.arg_list(0).join(" "))),
        )
        .command(
            CommandMetadata::builder("testExit")
                .description("Exit with the given status")
                .argument(ArgumentDef::new("code")),
            |inv| Ok(CommandResult::Integer(inv.arg_i64(0)?)),
        )
        .command(
            CommandMetadata::builder("testStatus")
                .description("Print a message and exit with a status")
                .argument(ArgumentDef::new("message"))
                .option(OptionDef::value("code", "0")),
            |inv| {
                let code = inv
                    .option_str("code")
                    .unwrap_or("0")
                    .parse::<i32>()
                    .map_err(|e| CommandError::with_code(format!("invalid code: {}", e), 2))?;
                Ok(CommandResult::with_exit_code(
                    inv.arg_str(0).unwrap_or_default(),
                    code,
                ))
            },
        )
        .command(
            CommandMetadata::builder("testFruits")
                .description("List fruit as structured data")
                .annotation("default-format", "csv")
                .annotation("default-fields", "name,color"),
            |_| {
                Ok(CommandResult::data(json!([
                    {"name": "apple", "color": "red", "price": 1},
                    {"name": "banana", "color": "yellow", "price": 2},
                ])))
            },
        )
        .command(
            CommandMetadata::builder("testWhoami")
                .description("Writes through the output sink")
                .special(SpecialParameter::Input)
                .special(SpecialParameter::Output),
            |inv| {
                let command = inv
                    .input()
                    .map(|input| input.command().to_string())
                    .unwrap_or_default();
                if let Some(output) = inv.output() {
                    output.write_line(&format!("running {}", command))?;
                }
                Ok(CommandResult::Empty)
            },
        )
        .hook(
            CommandMetadata::builder("logCommands").annotation("hook", format!("command-event {}", COMMAND_FILE)),
            Hook::command_event(|input, _| {
                tracing::info!(command = input.command(), "running command");
                Ok(())
            }),
        )
}

/// Builds the application around the reference command file.
pub fn application() -> Result<Application, RegistrationError> {
    let mut factory = CommandFactory::new();
    factory.register_command_file(example_commands())?;
    Application::builder()
        .name("annotated-example")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reference commands for annotated-command")
        .factory(factory)
        .build()
}
