//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, moderation};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let moderation_opts = moderation::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_url: auth_opts.frontend_url,
        session_key: auth_opts.session_key,
        admin_ids: auth_opts.admin_ids,
        moderation_url: moderation_opts.moderation_url,
        moderation_key: moderation_opts.moderation_key,
    }))
}
