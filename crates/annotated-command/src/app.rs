//! Application runner.
//!
//! An [`Application`] owns the built commands, assembles the clap root
//! command from them, parses argv and dispatches to the matching
//! [`AnnotatedCommand`].
//!
//! ```rust,ignore
//! let app = Application::builder()
//!     .name("example")
//!     .factory(factory)
//!     .default_command("list")
//!     .build()?;
//! std::process::exit(app.run());
//! ```

use clap::error::ErrorKind;
use clap::{ArgMatches, Command};
use std::ffi::OsString;

use crate::command::AnnotatedCommand;
use crate::factory::CommandFactory;
use crate::hooks::RegistrationError;
use crate::output::{ConsoleOutput, OutputSink};
use crate::processor::CommandProcessorBuilder;

/// A set of commands behind one clap root command.
#[derive(Debug)]
pub struct Application {
    name: String,
    version: Option<String>,
    about: Option<String>,
    commands: Vec<AnnotatedCommand>,
    default_command: Option<String>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn commands(&self) -> &[AnnotatedCommand] {
        &self.commands
    }

    /// Finds a command by name or alias.
    pub fn find(&self, name: &str) -> Option<&AnnotatedCommand> {
        self.commands.iter().find(|c| c.answers_to(name))
    }

    /// The clap root command with every command as a subcommand.
    pub fn root_command(&self) -> Command {
        let mut root = Command::new(self.name.clone());
        if let Some(version) = &self.version {
            root = root.version(version.clone());
        }
        if let Some(about) = &self.about {
            root = root.about(about.clone());
        }
        if self.default_command.is_none() {
            root = root.subcommand_required(true).arg_required_else_help(true);
        }
        root.subcommands(self.commands.iter().map(AnnotatedCommand::definition))
    }

    /// Runs with the process arguments, writing to stdout and stderr.
    pub fn run(&self) -> i32 {
        self.run_with(std::env::args_os(), &mut ConsoleOutput::new())
    }

    /// Runs with `args` (the first item is the binary name) and returns the
    /// exit status.
    pub fn run_with<I, T>(&self, args: I, output: &mut dyn OutputSink) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = self.resolve_args(args.into_iter().map(Into::into).collect());
        let matches = match self.root_command().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) => return report_clap_error(&err, output),
        };

        let Some((name, sub_matches)) = selected_command(&matches) else {
            tracing::debug!("no command selected");
            return 0;
        };
        match self.find(name) {
            Some(command) => {
                tracing::debug!(command = %command.name(), "dispatching");
                command.run(sub_matches, output)
            }
            None => {
                tracing::error!(command = name, "parsed command is not registered");
                1
            }
        }
    }

    /// Inserts the default command when the first argument does not name a
    /// command.
    fn resolve_args(&self, args: Vec<OsString>) -> Vec<OsString> {
        let Some(default) = &self.default_command else {
            return args;
        };
        let first = args.get(1).and_then(|a| a.to_str());
        let names_command = match first {
            Some(token) => {
                self.find(token).is_some()
                    || matches!(token, "help" | "-h" | "--help" | "-V" | "--version")
            }
            None => false,
        };
        if names_command {
            args
        } else {
            insert_default_command(args, default)
        }
    }
}

/// The selected subcommand and its matches, ignoring `help`.
fn selected_command(matches: &ArgMatches) -> Option<(&str, &ArgMatches)> {
    matches.subcommand().filter(|(name, _)| *name != "help")
}

/// Inserts `command` after the binary name.
fn insert_default_command(mut args: Vec<OsString>, command: &str) -> Vec<OsString> {
    if args.is_empty() {
        args.push(command.into());
    } else {
        args.insert(1, command.into());
    }
    args
}

/// Writes a clap error and returns its exit status. Help and version
/// output go to the standard channel; usage errors to the error channel.
fn report_clap_error(err: &clap::Error, output: &mut dyn OutputSink) -> i32 {
    let rendered = err.render().to_string();
    let written = if err.use_stderr() {
        match output.error_output() {
            Some(errors) => errors.write(&rendered),
            None => output.write(&rendered),
        }
    } else {
        output.write(&rendered)
    };
    if let Err(io) = written {
        tracing::error!(error = %io, "failed to write usage message");
    }
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => err.exit_code(),
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    name: Option<String>,
    version: Option<String>,
    about: Option<String>,
    factory: Option<CommandFactory>,
    processor: Option<CommandProcessorBuilder>,
    commands: Vec<AnnotatedCommand>,
    default_command: Option<String>,
}

impl ApplicationBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Builds commands from `factory` when the application is built.
    pub fn factory(mut self, factory: CommandFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Configures the processor the factory's commands share.
    pub fn processor(mut self, processor: CommandProcessorBuilder) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Adds an already built command.
    pub fn command(mut self, command: AnnotatedCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// Runs `name` when argv names no command.
    pub fn default_command(mut self, name: impl Into<String>) -> Self {
        self.default_command = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Application, RegistrationError> {
        let mut commands = match self.factory {
            Some(factory) => factory.build_with(self.processor.unwrap_or_default())?,
            None => Vec::new(),
        };
        for command in self.commands {
            if let Some(existing) = commands
                .iter()
                .find(|c| command.scopes().iter().any(|name| c.answers_to(name)))
            {
                return Err(RegistrationError::DuplicateCommand {
                    name: command.name().to_string(),
                    first: existing.metadata().method_name().to_string(),
                    second: command.metadata().method_name().to_string(),
                });
            }
            commands.push(command);
        }

        Ok(Application {
            name: self.name.unwrap_or_else(|| "app".to_string()),
            version: self.version,
            about: self.about,
            commands,
            default_command: self.default_command,
        })
    }
}
