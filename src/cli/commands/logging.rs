use clap::{Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn with_args(command: Command) -> Command {
    // Quieter-than-default levels go through VELLUM_LOG / RUST_LOG directives
    // instead of a flag.
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Increase log verbosity: -v DEBUG, -vv TRACE (default: INFO)")
            .global(true)
            .action(ArgAction::Count),
    )
}
