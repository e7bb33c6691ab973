//! Verification codes and single-use exchange tokens for email flows.
//!
//! Registration and password reset both start here: a 6-digit code is mailed
//! to the address and stored with a short TTL, a correct confirmation burns
//! the code and hands back an exchange token with a longer TTL, and the
//! sensitive operation finally consumes that token exactly once. A cooldown
//! marker per email gates re-sending.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use utoipa::ToSchema;

use super::state::AuthState;
use super::storage::{exchange_token_key, rate_limit_key, verification_key};
use super::types::{ConfirmCodeRequest, SendCodeRequest};
use super::utils::{
    generate_exchange_token, generate_verification_code, normalize_email, valid_email,
};
use crate::api::email::EmailSender;
use crate::api::handlers::{ApiEnvelope, fail, ok, ok_empty, rate_limited, server_error};
use crate::store::KeyValue;

/// Flow a code or exchange token belongs to; part of the storage key, so
/// codes for one flow can never authorize the other.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodePurpose {
    Register,
    Reset,
}

impl CodePurpose {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Reset => "reset",
        }
    }
}

pub(crate) enum IssueOutcome {
    Issued,
    RateLimited,
}

pub(crate) enum ConfirmOutcome {
    Confirmed { exchange_token: String },
    Invalid,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConsumeOutcome {
    Consumed,
    Invalid,
}

/// Generate, store, and mail a verification code unless the cooldown marker
/// for this email is still live.
pub(crate) async fn issue_code(
    kv: &dyn KeyValue,
    email_sender: &dyn EmailSender,
    state: &AuthState,
    purpose: CodePurpose,
    email_normalized: &str,
) -> anyhow::Result<IssueOutcome> {
    if kv.get(&rate_limit_key(email_normalized)).await?.is_some() {
        return Ok(IssueOutcome::RateLimited);
    }

    let code = generate_verification_code();
    kv.setex(
        &verification_key(purpose.as_str(), email_normalized),
        &code,
        Duration::from_secs(state.config().code_ttl_seconds()),
    )
    .await?;
    kv.setex(
        &rate_limit_key(email_normalized),
        "1",
        Duration::from_secs(state.config().resend_cooldown_seconds()),
    )
    .await?;

    // The code is already stored; a failed send only costs the user a resend
    // after the cooldown.
    if let Err(err) = email_sender
        .send(
            email_normalized,
            verification_subject(purpose),
            &verification_body(purpose, &code, state.config().code_ttl_seconds()),
        )
        .await
    {
        warn!("Failed to send verification email: {err}");
    }

    Ok(IssueOutcome::Issued)
}

/// Compare the submitted code with the stored one; a match burns the code and
/// issues an exchange token. A mismatch leaves the code consumable until its
/// TTL runs out.
pub(crate) async fn confirm_code(
    kv: &dyn KeyValue,
    state: &AuthState,
    purpose: CodePurpose,
    email_normalized: &str,
    code: &str,
) -> anyhow::Result<ConfirmOutcome> {
    let key = verification_key(purpose.as_str(), email_normalized);
    let Some(stored) = kv.get(&key).await? else {
        return Ok(ConfirmOutcome::Invalid);
    };
    if stored.trim() != code.trim() {
        return Ok(ConfirmOutcome::Invalid);
    }

    kv.del(&key).await?;
    let exchange_token = generate_exchange_token()?;
    kv.setex(
        &exchange_token_key(purpose.as_str(), email_normalized),
        &exchange_token,
        Duration::from_secs(state.config().exchange_ttl_seconds()),
    )
    .await?;
    Ok(ConfirmOutcome::Confirmed { exchange_token })
}

/// Single-use check of an exchange token; deletes it on success only.
pub(crate) async fn consume_exchange_token(
    kv: &dyn KeyValue,
    purpose: CodePurpose,
    email_normalized: &str,
    token: &str,
) -> anyhow::Result<ConsumeOutcome> {
    let key = exchange_token_key(purpose.as_str(), email_normalized);
    let Some(stored) = kv.get(&key).await? else {
        return Ok(ConsumeOutcome::Invalid);
    };
    if stored != token {
        return Ok(ConsumeOutcome::Invalid);
    }
    kv.del(&key).await?;
    Ok(ConsumeOutcome::Consumed)
}

fn verification_subject(purpose: CodePurpose) -> &'static str {
    match purpose {
        CodePurpose::Register => "Confirm your email address",
        CodePurpose::Reset => "Reset your password",
    }
}

fn verification_body(purpose: CodePurpose, code: &str, ttl_seconds: u64) -> String {
    let minutes = ttl_seconds / 60;
    let intro = match purpose {
        CodePurpose::Register => "Use this code to finish creating your account.",
        CodePurpose::Reset => "Use this code to reset your password.",
    };
    format!(
        "<p>{intro}</p><p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
         <p>The code expires in {minutes} minutes. If you did not request it, ignore this mail.</p>"
    )
}

#[utoipa::path(
    post,
    path = "/v1/auth/verification",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Code sent", body = ApiEnvelope),
        (status = 400, description = "Invalid email", body = ApiEnvelope),
        (status = 429, description = "Cooldown active", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn send_code(
    kv: Extension<Arc<dyn KeyValue>>,
    email_sender: Extension<Arc<dyn EmailSender>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendCodeRequest>>,
) -> impl IntoResponse {
    let request: SendCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(StatusCode::BAD_REQUEST, "Invalid email address");
    }

    match issue_code(
        kv.as_ref(),
        email_sender.as_ref(),
        &auth_state,
        request.purpose,
        &email,
    )
    .await
    {
        Ok(IssueOutcome::Issued) => ok_empty(),
        Ok(IssueOutcome::RateLimited) => rate_limited(
            "A code was sent recently, wait before requesting another",
            auth_state.config().resend_cooldown_seconds(),
        ),
        Err(err) => {
            error!("Failed to issue verification code: {err}");
            server_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/verification/confirm",
    request_body = ConfirmCodeRequest,
    responses(
        (status = 200, description = "Code confirmed, exchange token issued", body = ApiEnvelope),
        (status = 400, description = "Invalid or expired code", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn confirm(
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ConfirmCodeRequest>>,
) -> impl IntoResponse {
    let request: ConfirmCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if request.code.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Missing verification code");
    }

    match confirm_code(
        kv.as_ref(),
        &auth_state,
        request.purpose,
        &email,
        &request.code,
    )
    .await
    {
        Ok(ConfirmOutcome::Confirmed { exchange_token }) => {
            ok(json!({"exchangeToken": exchange_token}))
        }
        Ok(ConfirmOutcome::Invalid) => fail(
            StatusCode::BAD_REQUEST,
            "Verification code is invalid or expired",
        ),
        Err(err) => {
            error!("Failed to confirm verification code: {err}");
            server_error()
        }
    }
}
