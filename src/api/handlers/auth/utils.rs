//! Small helpers for credential validation and token generation.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use rand::{Rng, RngCore, rngs::OsRng};
use regex::Regex;
use ulid::Ulid;

/// Minimum password length for registration and reset.
pub(crate) const MIN_PASSWORD_CHARS: usize = 6;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Usernames are 3 to 20 chars from `[A-Za-z0-9_-]`.
pub(super) fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_-]{3,20}$").is_ok_and(|regex| regex.is_match(username))
}

pub(super) fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

/// Collision-resistant sortable id for accounts and notes.
pub(crate) fn new_id() -> String {
    Ulid::new().to_string()
}

/// Record timestamp: RFC 3339 UTC with millisecond precision, so stored
/// strings sort chronologically.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Opaque single-use token handed out after a verification code checks out.
/// Only ever compared for equality against the stored copy.
pub(super) fn generate_exchange_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate exchange token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Six-digit code delivered by email, uniform over 100000..=999999.
pub(super) fn generate_verification_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
