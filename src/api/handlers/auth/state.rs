//! Auth configuration and shared request state.

use std::collections::HashSet;

use super::token::SessionKeys;

const DEFAULT_CODE_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_EXCHANGE_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_RESEND_COOLDOWN_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    code_ttl_seconds: u64,
    exchange_ttl_seconds: u64,
    resend_cooldown_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            code_ttl_seconds: DEFAULT_CODE_TTL_SECONDS,
            exchange_ttl_seconds: DEFAULT_EXCHANGE_TTL_SECONDS,
            resend_cooldown_seconds: DEFAULT_RESEND_COOLDOWN_SECONDS,
        }
    }

    #[must_use]
    pub fn with_code_ttl_seconds(mut self, seconds: u64) -> Self {
        self.code_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_exchange_ttl_seconds(mut self, seconds: u64) -> Self {
        self.exchange_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_resend_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.resend_cooldown_seconds = seconds;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn code_ttl_seconds(&self) -> u64 {
        self.code_ttl_seconds
    }

    pub(super) fn exchange_ttl_seconds(&self) -> u64 {
        self.exchange_ttl_seconds
    }

    pub(super) fn resend_cooldown_seconds(&self) -> u64 {
        self.resend_cooldown_seconds
    }

    /// Cookies are marked `Secure` only when the frontend is served over HTTPS.
    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Fixed allow-list of operator account ids, injected at startup so the
/// authorization check stays testable. Never read from the environment at
/// call sites.
#[derive(Clone, Debug, Default)]
pub struct AdminRoster {
    operator_ids: HashSet<String>,
}

impl AdminRoster {
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_operator(&self, account_id: &str) -> bool {
        self.operator_ids.contains(account_id)
    }
}

pub struct AuthState {
    config: AuthConfig,
    keys: SessionKeys,
    admins: AdminRoster,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, keys: SessionKeys, admins: AdminRoster) -> Self {
        Self {
            config,
            keys,
            admins,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    pub(crate) fn admins(&self) -> &AdminRoster {
        &self.admins
    }
}
