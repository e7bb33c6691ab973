use crate::api::{
    self, AdminRoster, AuthConfig, AuthState, DEV_SIGNING_KEY, SessionKeys,
    email::{EmailSender, LogEmailSender},
    moderation::{ContentModerator, DisabledModerator, RemoteModerator},
};
use crate::store::{KeyValue, MemoryKv};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_url: String,
    pub session_key: Option<String>,
    pub admin_ids: Vec<String>,
    pub moderation_url: Option<String>,
    pub moderation_key: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a collaborator cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: Arc<dyn KeyValue> = Arc::new(MemoryKv::new());

    let email_sender: Arc<dyn EmailSender> = Arc::new(LogEmailSender);

    let moderator: Arc<dyn ContentModerator> = match args.moderation_url {
        Some(endpoint) => {
            let api_key = SecretString::from(args.moderation_key.unwrap_or_default());
            Arc::new(RemoteModerator::new(endpoint, api_key)?)
        }
        None => {
            info!("Content moderation endpoint not configured, submissions pass unscreened");
            Arc::new(DisabledModerator)
        }
    };

    let signing_key = match args.session_key {
        Some(key) => SecretString::from(key),
        None => {
            warn!("No session key provided, using the development signing key");
            SecretString::from(DEV_SIGNING_KEY.to_string())
        }
    };

    if args.admin_ids.is_empty() {
        info!("No operator accounts configured, admin endpoints will reject everyone");
    }

    let auth_state = Arc::new(AuthState::new(
        AuthConfig::new(args.frontend_url),
        SessionKeys::new(&signing_key),
        AdminRoster::new(args.admin_ids),
    ));

    api::new(args.port, store, auth_state, email_sender, moderator).await
}
