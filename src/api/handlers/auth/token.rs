//! Self-contained signed session tokens.
//!
//! A session is a signed claims blob with an absolute expiry and no
//! server-side record: nothing is revoked early, so a token stays valid
//! until it expires even across a password reset. Deployments wanting
//! revocation would put a denylist keyed by token id in front of
//! [`SessionKeys::verify`].

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Sessions last seven days from issuance.
pub(crate) const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Tolerated clock drift between issuer and verifier.
const CLOCK_SKEW_LEEWAY_SECONDS: u64 = 60;

/// Fallback signing key for local development. Any real deployment must
/// override it; startup logs a warning when this key is in use.
pub const DEV_SIGNING_KEY: &str = "vellum-dev-signing-key-change-in-production";

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SessionClaims {
    /// Account id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Process-wide signing key pair, read-only after startup.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Sign a session for the given account, expiring seven days out.
    pub(crate) fn issue(&self, account_id: &str, username: &str) -> Result<String> {
        let now = now_unix();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + SESSION_TTL_SECONDS,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Decode and validate a session token.
    ///
    /// Tampered, malformed, and expired tokens all come back `None`; the
    /// holder is simply anonymous.
    pub(crate) fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY_SECONDS;
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                debug!("Discarding session token: {err}");
                None
            }
        }
    }
}

fn now_unix() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new(&SecretString::from("test-signing-key".to_string()))
    }

    #[test]
    fn issue_then_verify_returns_claims() -> Result<()> {
        let keys = keys();
        let token = keys.issue("01JLZ2V7Q0", "alice")?;

        let claims = keys.verify(&token).ok_or_else(|| anyhow::anyhow!("rejected"))?;
        assert_eq!(claims.sub, "01JLZ2V7Q0");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn tampered_token_is_rejected() -> Result<()> {
        let keys = keys();
        let token = keys.issue("01JLZ2V7Q0", "alice")?;

        // Flip one character of the signature segment.
        let mut bytes = token.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes)?;

        assert!(keys.verify(&tampered).is_none());
        Ok(())
    }

    #[test]
    fn wrong_key_is_rejected() -> Result<()> {
        let token = keys().issue("01JLZ2V7Q0", "alice")?;
        let other = SessionKeys::new(&SecretString::from("another-key".to_string()));
        assert!(other.verify(&token).is_none());
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<()> {
        let keys = keys();
        let stale = SessionClaims {
            sub: "01JLZ2V7Q0".to_string(),
            username: "alice".to_string(),
            iat: now_unix() - SESSION_TTL_SECONDS - 3600,
            exp: now_unix() - 3600,
        };
        let token = encode(&Header::default(), &stale, &keys.encoding)?;
        assert!(keys.verify(&token).is_none());
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(keys().verify("not-a-token").is_none());
        assert!(keys().verify("").is_none());
    }
}
