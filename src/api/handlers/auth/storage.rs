//! Account records and secondary indices over the key-value store.
//!
//! Key shapes:
//! - `user:{id}` account record (JSON)
//! - `user:username:{username}` -> account id
//! - `user:email:{email}` -> account id
//! - `verification:{purpose}:{email}` -> 6-digit code, short TTL
//! - `temp_token:{purpose}:{email}` -> exchange token, short TTL
//! - `email_rate_limit:{email}` -> resend cooldown marker
//!
//! The store has no multi-key transactions. Creation writes the record first
//! and the indices after; deletion removes the indices first. A crash
//! mid-sequence must leave an unreachable record, never a dangling index.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::KeyValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Exempts the account's note content from moderation. Absent on records
    /// written before the flag existed.
    #[serde(default)]
    pub no_content_audit: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn account_key(id: &str) -> String {
    format!("user:{id}")
}

pub(crate) fn username_key(username: &str) -> String {
    format!("user:username:{username}")
}

pub(crate) fn email_key(email_normalized: &str) -> String {
    format!("user:email:{email_normalized}")
}

pub(crate) fn verification_key(purpose: &str, email_normalized: &str) -> String {
    format!("verification:{purpose}:{email_normalized}")
}

pub(crate) fn exchange_token_key(purpose: &str, email_normalized: &str) -> String {
    format!("temp_token:{purpose}:{email_normalized}")
}

pub(crate) fn rate_limit_key(email_normalized: &str) -> String {
    format!("email_rate_limit:{email_normalized}")
}

pub(crate) async fn fetch_account(kv: &dyn KeyValue, id: &str) -> Result<Option<Account>> {
    let Some(raw) = kv.get(&account_key(id)).await? else {
        return Ok(None);
    };
    let account = serde_json::from_str(&raw).context("corrupt account record")?;
    Ok(Some(account))
}

pub(crate) async fn save_account(kv: &dyn KeyValue, account: &Account) -> Result<()> {
    let raw = serde_json::to_string(account).context("serialize account record")?;
    kv.set(&account_key(&account.id), &raw).await
}

/// Resolve a username to an account id via the secondary index.
pub(crate) async fn resolve_username(kv: &dyn KeyValue, username: &str) -> Result<Option<String>> {
    kv.get(&username_key(username)).await
}

/// Resolve a normalized email to an account id via the secondary index.
pub(crate) async fn resolve_email(
    kv: &dyn KeyValue,
    email_normalized: &str,
) -> Result<Option<String>> {
    kv.get(&email_key(email_normalized)).await
}

pub(crate) async fn fetch_account_by_username(
    kv: &dyn KeyValue,
    username: &str,
) -> Result<Option<Account>> {
    match resolve_username(kv, username).await? {
        Some(id) => fetch_account(kv, &id).await,
        None => Ok(None),
    }
}

pub(crate) async fn fetch_account_by_email(
    kv: &dyn KeyValue,
    email_normalized: &str,
) -> Result<Option<Account>> {
    match resolve_email(kv, email_normalized).await? {
        Some(id) => fetch_account(kv, &id).await,
        None => Ok(None),
    }
}

/// Write the record and both indices, record first, email index last.
pub(crate) async fn create_account(kv: &dyn KeyValue, account: &Account) -> Result<()> {
    save_account(kv, account).await?;
    kv.set(&username_key(&account.username), &account.id).await?;
    kv.set(&email_key(&account.email), &account.id).await?;
    Ok(())
}

/// Drop the username and email indices so the account can no longer be
/// resolved for login. The record itself stays until
/// [`remove_account_record`] runs.
pub(crate) async fn remove_login_indices(kv: &dyn KeyValue, account: &Account) -> Result<()> {
    kv.del(&username_key(&account.username)).await?;
    kv.del(&email_key(&account.email)).await?;
    Ok(())
}

pub(crate) async fn remove_account_record(kv: &dyn KeyValue, id: &str) -> Result<()> {
    kv.del(&account_key(id)).await
}

/// Remove both indices, then the record, indices first.
pub(crate) async fn delete_account(kv: &dyn KeyValue, account: &Account) -> Result<()> {
    remove_login_indices(kv, account).await?;
    remove_account_record(kv, &account.id).await
}
