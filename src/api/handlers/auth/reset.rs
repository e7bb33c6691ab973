//! Password reset, gated on a proof of email ownership.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::error;

use super::password::{ACCOUNT_COST, hash_password};
use super::state::AuthState;
use super::storage::{fetch_account_by_email, save_account};
use super::types::ResetPasswordRequest;
use super::utils::{normalize_email, now_rfc3339, valid_email, valid_password};
use super::verification::{CodePurpose, ConsumeOutcome, consume_exchange_token};
use crate::api::handlers::{ApiEnvelope, fail, ok_empty, server_error};
use crate::store::KeyValue;

#[utoipa::path(
    post,
    path = "/v1/auth/password/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = ApiEnvelope),
        (status = 400, description = "Invalid input or exchange token", body = ApiEnvelope),
        (status = 404, description = "No account for that email", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    kv: Extension<Arc<dyn KeyValue>>,
    _auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if !valid_password(&request.new_password) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        );
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if request.exchange_token.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Missing exchange token");
    }

    match consume_exchange_token(kv.as_ref(), CodePurpose::Reset, &email, &request.exchange_token)
        .await
    {
        Ok(ConsumeOutcome::Consumed) => {}
        Ok(ConsumeOutcome::Invalid) => {
            return fail(
                StatusCode::BAD_REQUEST,
                "Invalid or expired exchange token",
            );
        }
        Err(err) => {
            error!("Failed to consume exchange token: {err}");
            return server_error();
        }
    }

    let account = match fetch_account_by_email(kv.as_ref(), &email).await {
        Ok(Some(account)) => account,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Account not found"),
        Err(err) => {
            error!("Failed to load account for reset: {err}");
            return server_error();
        }
    };

    let password_hash = match hash_password(&request.new_password, ACCOUNT_COST) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash replacement password: {err}");
            return server_error();
        }
    };

    let mut account = account;
    account.password_hash = password_hash;
    account.updated_at = now_rfc3339();
    if let Err(err) = save_account(kv.as_ref(), &account).await {
        error!("Failed to persist password reset: {err}");
        return server_error();
    }

    // The caller still has to log in with the new password; reset never
    // issues a session by itself.
    ok_empty()
}
