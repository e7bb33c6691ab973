pub mod auth;
pub mod logging;
pub mod moderation;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!(
            "{} - {}",
            env!("CARGO_PKG_VERSION"),
            crate::GIT_COMMIT_HASH
        )
        .into_boxed_str(),
    );

    let command = Command::new("vellum")
        .about("Accounts, sessions, and note access control for a hosted notes service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("VELLUM_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = auth::with_args(command);
    let command = moderation::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "vellum");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(
                "Accounts, sessions, and note access control for a hosted notes service"
                    .to_string()
            )
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "vellum",
            "--port",
            "9090",
            "--frontend-url",
            "https://notes.vellum.ink",
            "--session-key",
            "super-secret",
            "--admin-ids",
            "op-1,op-2",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(
            matches.get_one::<String>(auth::ARG_FRONTEND_URL).cloned(),
            Some("https://notes.vellum.ink".to_string())
        );
        assert_eq!(
            matches.get_one::<String>(auth::ARG_SESSION_KEY).cloned(),
            Some("super-secret".to_string())
        );
        assert_eq!(
            matches.get_one::<String>(auth::ARG_ADMIN_IDS).cloned(),
            Some("op-1,op-2".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("VELLUM_PORT", Some("443")),
                ("VELLUM_FRONTEND_URL", Some("https://notes.vellum.ink")),
                ("VELLUM_SESSION_KEY", Some("from-env")),
                ("VELLUM_ADMIN_IDS", Some("op-9")),
                (
                    "VELLUM_MODERATION_URL",
                    Some("https://moderation.vellum.ink/v1/check"),
                ),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["vellum"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_FRONTEND_URL).cloned(),
                    Some("https://notes.vellum.ink".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_SESSION_KEY).cloned(),
                    Some("from-env".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_ADMIN_IDS).cloned(),
                    Some("op-9".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<String>(moderation::ARG_MODERATION_URL)
                        .cloned(),
                    Some("https://moderation.vellum.ink/v1/check".to_string())
                );
            },
        );
    }

    #[test]
    fn test_check_verbosity() {
        for count in 0..4_usize {
            let mut args = vec!["vellum".to_string()];

            // Add the appropriate number of "-v" flags based on the count
            if count > 0 {
                let v = format!("-{}", "v".repeat(count));
                args.push(v);
            }

            let command = new();

            let matches = command.get_matches_from(args);

            assert_eq!(
                matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                u8::try_from(count).ok()
            );
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let command = new();

        let result = command
            .clone()
            .try_get_matches_from(vec!["vellum", "--port", "99999"]);
        assert_eq!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ValueValidation)
        );

        let result = command.try_get_matches_from(vec!["vellum", "--port", "not-a-port"]);
        assert_eq!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ValueValidation)
        );
    }
}
