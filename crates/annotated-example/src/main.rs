//! Reference commands wired through annotated-command.
//!
//! ```text
//! annotated-example test:arithmatic 2 3 --negate    # -5
//! annotated-example test:hook bar                   # <[bar]>
//! annotated-example test:hello "Donald Duck"        # exits 1
//! annotated-example test:echo a b -- c d            # a b c d
//! ```
//!
//! Set `RUST_LOG=debug` to watch hooks being registered and dispatched.

mod commands;

use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match commands::application() {
        Ok(app) => app.run(),
        Err(err) => {
            let err = anyhow::Error::new(err).context("failed to register commands");
            eprintln!("error: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}
