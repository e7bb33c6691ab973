//! Request/response types for account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::storage::Account;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    pub email: String,
    pub purpose: super::verification::CodePurpose,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCodeRequest {
    pub email: String,
    pub purpose: super::verification::CodePurpose,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub exchange_token: String,
    pub captcha_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email; email-shaped identifiers resolve via the email index.
    pub identifier: String,
    pub password: String,
    pub captcha_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub exchange_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    pub password: String,
    /// Must equal the fixed phrase exactly; the UI makes the user type it.
    pub confirmation: String,
}

/// Account as returned to its owner; credential material stripped.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub no_content_audit: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Account> for SessionUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            no_content_audit: account.no_content_audit,
            created_at: account.created_at.clone(),
            updated_at: account.updated_at.clone(),
        }
    }
}
