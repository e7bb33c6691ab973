//! One-way password hashing for accounts and protected notes.

use anyhow::Result;
use tracing::warn;

/// Work factor for account credentials.
pub(crate) const ACCOUNT_COST: u32 = 10;

/// Work factor for note passwords. Higher than accounts since note passwords
/// are verified rarely and brute-forced offline if the store ever leaks.
pub(crate) const NOTE_COST: u32 = 12;

/// Hash a password with the given bcrypt cost.
pub(crate) fn hash_password(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash rejects the password instead of erroring; legacy
/// rows must never take down a login.
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matched) => matched,
        Err(err) => {
            warn!("Rejecting password against unparseable hash: {err}");
            false
        }
    }
}
