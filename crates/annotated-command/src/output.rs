//! Output sinks.
//!
//! An [`OutputSink`] is where the pipeline writes a command's output. A sink
//! may expose a separate error channel; when it does, output of a failed
//! command goes there instead of the standard channel.
//!
//! - [`ConsoleOutput`]: stdout, with stderr as the error channel
//! - [`StreamOutput`]: any `Write`, single channel
//! - [`BufferedOutput`]: in-memory, optionally with an error channel

use std::io::{self, Write};

/// Destination for command output.
pub trait OutputSink {
    /// Writes `text` as-is.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Writes `text` followed by a newline.
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.write(text)?;
        self.write("\n")
    }

    /// The separate error channel, if this sink has one.
    fn error_output(&mut self) -> Option<&mut dyn OutputSink> {
        None
    }

    /// Whether the standard channel is attached to a terminal.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Writes to any `Write` implementation. Has no error channel.
#[derive(Debug)]
pub struct StreamOutput<W: Write> {
    writer: W,
    terminal: bool,
}

impl<W: Write> StreamOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            terminal: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for StreamOutput<W> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

/// Standard output with standard error as the error channel.
#[derive(Debug)]
pub struct ConsoleOutput {
    stdout: StreamOutput<io::Stdout>,
    stderr: StreamOutput<io::Stderr>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self {
            stdout: StreamOutput {
                writer: io::stdout(),
                terminal: atty::is(atty::Stream::Stdout),
            },
            stderr: StreamOutput {
                writer: io::stderr(),
                terminal: atty::is(atty::Stream::Stderr),
            },
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleOutput {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write(text)
    }

    fn error_output(&mut self) -> Option<&mut dyn OutputSink> {
        Some(&mut self.stderr)
    }

    fn is_terminal(&self) -> bool {
        self.stdout.is_terminal()
    }
}

/// In-memory sink for tests and for capturing output.
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    buffer: String,
    error: Option<Box<BufferedOutput>>,
    terminal: bool,
}

impl BufferedOutput {
    /// A single-channel buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer with a separate error channel.
    pub fn with_error_channel() -> Self {
        Self {
            error: Some(Box::default()),
            ..Self::default()
        }
    }

    /// Reports the buffer as a terminal.
    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// What was written to the standard channel.
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// What was written to the error channel; empty when there is none.
    pub fn error_contents(&self) -> &str {
        self.error.as_deref().map(|e| e.contents()).unwrap_or("")
    }
}

impl OutputSink for BufferedOutput {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        Ok(())
    }

    fn error_output(&mut self) -> Option<&mut dyn OutputSink> {
        self.error
            .as_deref_mut()
            .map(|e| e as &mut dyn OutputSink)
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}
