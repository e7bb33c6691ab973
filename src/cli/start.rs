use crate::cli::{actions::Action, commands, dispatch};
use anyhow::Result;
use std::env::var;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Environment variable holding filter directives; `RUST_LOG` is the fallback.
const LOG_ENV_VAR: &str = "VELLUM_LOG";

/// Map verbosity count to tracing level; `None` keeps the INFO default.
const fn get_verbosity_level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Initialize logging with the flag-driven default level.
///
/// # Errors
///
/// Returns an error if subscriber initialization fails
fn init_telemetry(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::INFO);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let builder = EnvFilter::builder().with_default_directive(verbosity_level.into());
    let filter = if var(LOG_ENV_VAR).is_ok() {
        builder.with_env_var(LOG_ENV_VAR).from_env_lossy()
    } else {
        builder.from_env_lossy()
    }
    .add_directive("hyper=error".parse()?)
    .add_directive("tokio=error".parse()?);

    let subscriber = Registry::default().with(fmt_layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Main entry point for the CLI - builds and returns the Action
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<Action> {
    // 1. Parse command-line arguments
    let matches = commands::new().get_matches();

    // 2. Extract verbosity level
    let verbosity_level = get_verbosity_level(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0),
    );

    // 3. Initialize telemetry
    init_telemetry(verbosity_level)?;

    // 4. Dispatch to appropriate action
    let action = dispatch::handler(&matches)?;

    // 5. Return the action for execution by the binary
    Ok(action)
}
