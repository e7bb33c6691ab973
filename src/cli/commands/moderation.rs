use clap::{Arg, ArgMatches, Command};

pub const ARG_MODERATION_URL: &str = "moderation-url";
pub const ARG_MODERATION_KEY: &str = "moderation-key";

#[derive(Debug, Clone)]
pub struct Options {
    pub moderation_url: Option<String>,
    pub moderation_key: Option<String>,
}

impl Options {
    /// Parse moderation arguments from matches.
    ///
    /// # Errors
    /// Currently infallible; kept fallible to match the other option parsers.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |name: &str| {
            matches
                .get_one::<String>(name)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            moderation_url: get_non_empty(ARG_MODERATION_URL),
            moderation_key: get_non_empty(ARG_MODERATION_KEY),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MODERATION_URL)
                .long(ARG_MODERATION_URL)
                .help("Content moderation endpoint; moderation is skipped when unset")
                .env("VELLUM_MODERATION_URL"),
        )
        .arg(
            Arg::new(ARG_MODERATION_KEY)
                .long(ARG_MODERATION_KEY)
                .help("API key sent to the moderation endpoint")
                .env("VELLUM_MODERATION_KEY"),
        )
}
