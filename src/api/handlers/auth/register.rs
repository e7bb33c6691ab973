//! Registration endpoint: the final step of the email-verified signup flow.

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::password::{ACCOUNT_COST, hash_password};
use super::session::session_cookie;
use super::state::AuthState;
use super::storage::{Account, create_account, resolve_email, resolve_username};
use super::types::{RegisterRequest, SessionUser};
use super::utils::{
    new_id, normalize_email, now_rfc3339, valid_email, valid_password, valid_username,
};
use super::verification::{CodePurpose, ConsumeOutcome, consume_exchange_token};
use crate::api::captcha;
use crate::api::handlers::{ApiEnvelope, fail, ok, server_error};
use crate::store::KeyValue;

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, session cookie set", body = ApiEnvelope),
        (status = 400, description = "Validation or verification failure", body = ApiEnvelope),
        (status = 409, description = "Username or email already taken", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn register(
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if !captcha::acceptable(&request.captcha_token) {
        return fail(StatusCode::BAD_REQUEST, "Captcha verification failed");
    }

    let username = request.username.trim();
    if !valid_username(username) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Username must be 3-20 characters from letters, digits, _ or -",
        );
    }
    if !valid_password(&request.password) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        );
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if request.exchange_token.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Email verification required");
    }

    // Burn the exchange token before any uniqueness work; a stale token must
    // not learn which usernames exist.
    match consume_exchange_token(
        kv.as_ref(),
        CodePurpose::Register,
        &email,
        &request.exchange_token,
    )
    .await
    {
        Ok(ConsumeOutcome::Consumed) => {}
        Ok(ConsumeOutcome::Invalid) => {
            return fail(
                StatusCode::BAD_REQUEST,
                "Email verification expired, request a new code",
            );
        }
        Err(err) => {
            error!("Failed to consume exchange token: {err}");
            return server_error();
        }
    }

    match resolve_username(kv.as_ref(), username).await {
        Ok(Some(_)) => return fail(StatusCode::CONFLICT, "Username already taken"),
        Ok(None) => {}
        Err(err) => {
            error!("Failed to check username index: {err}");
            return server_error();
        }
    }
    match resolve_email(kv.as_ref(), &email).await {
        Ok(Some(_)) => return fail(StatusCode::CONFLICT, "Email already registered"),
        Ok(None) => {}
        Err(err) => {
            error!("Failed to check email index: {err}");
            return server_error();
        }
    }

    let password_hash = match hash_password(&request.password, ACCOUNT_COST) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return server_error();
        }
    };

    let now = now_rfc3339();
    let account = Account {
        id: new_id(),
        username: username.to_string(),
        email,
        password_hash,
        no_content_audit: false,
        created_at: now.clone(),
        updated_at: now,
    };

    if let Err(err) = create_account(kv.as_ref(), &account).await {
        error!("Failed to create account: {err}");
        return server_error();
    }

    let token = match auth_state.keys().issue(&account.id, &account.username) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return server_error();
        }
    };
    let cookie = match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return server_error();
        }
    };

    let mut response = ok(json!({"user": SessionUser::from(&account)}));
    response.headers_mut().insert(SET_COOKIE, cookie);
    response
}
