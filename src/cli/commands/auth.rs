use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_SESSION_KEY: &str = "session-key";
pub const ARG_ADMIN_IDS: &str = "admin-ids";

#[derive(Debug, Clone)]
pub struct Options {
    pub frontend_url: String,
    pub session_key: Option<String>,
    pub admin_ids: Vec<String>,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the frontend URL is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let frontend_url = matches
            .get_one::<String>(ARG_FRONTEND_URL)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_FRONTEND_URL}"))?;

        // Empty env values count as unset.
        let session_key = matches
            .get_one::<String>(ARG_SESSION_KEY)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        let admin_ids = matches
            .get_one::<String>(ARG_ADMIN_IDS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            frontend_url,
            session_key,
            admin_ids,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend base URL; locks the CORS origin and decides Secure cookies")
                .env("VELLUM_FRONTEND_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_KEY)
                .long(ARG_SESSION_KEY)
                .help("Secret used to sign session tokens; a development key is used when unset")
                .env("VELLUM_SESSION_KEY"),
        )
        .arg(
            Arg::new(ARG_ADMIN_IDS)
                .long(ARG_ADMIN_IDS)
                .help("Comma-separated account ids allowed to use operator endpoints")
                .env("VELLUM_ADMIN_IDS"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("vellum"))
    }

    #[test]
    fn frontend_url_has_a_default() -> anyhow::Result<()> {
        temp_env::with_vars([("VELLUM_FRONTEND_URL", None::<&str>)], || {
            let matches = command().get_matches_from(vec!["vellum"]);
            let options = Options::parse(&matches)?;
            assert_eq!(options.frontend_url, "http://localhost:3000");
            assert!(options.session_key.is_none());
            assert!(options.admin_ids.is_empty());
            Ok(())
        })
    }

    #[test]
    fn admin_ids_split_on_commas() -> anyhow::Result<()> {
        temp_env::with_vars(
            [("VELLUM_ADMIN_IDS", Some("op-1, op-2,,op-3 "))],
            || {
                let matches = command().get_matches_from(vec!["vellum"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.admin_ids, vec!["op-1", "op-2", "op-3"]);
                Ok(())
            },
        )
    }

    #[test]
    fn empty_session_key_env_counts_as_unset() -> anyhow::Result<()> {
        temp_env::with_vars([("VELLUM_SESSION_KEY", Some(""))], || {
            let matches = command().get_matches_from(vec!["vellum"]);
            let options = Options::parse(&matches)?;
            assert!(options.session_key.is_none());
            Ok(())
        })
    }
}
