//! Session endpoints for cookie and bearer auth.

use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::state::{AuthConfig, AuthState};
use super::storage::fetch_account;
use super::types::SessionUser;
use crate::api::handlers::{ApiEnvelope, ok, ok_empty, server_error};
use crate::store::KeyValue;

const SESSION_COOKIE_NAME: &str = "auth-token";

/// Authenticated caller resolved from a session token.
#[derive(Debug, Clone)]
pub(crate) struct Identity {
    pub account_id: String,
    pub username: String,
}

/// Resolve the caller's identity from the request headers.
///
/// Bearer tokens win over the cookie. A missing or invalid token yields
/// `None`; it never fails the surrounding request by itself.
pub(crate) fn authenticate_request(headers: &HeaderMap, state: &AuthState) -> Option<Identity> {
    let token = extract_session_token(headers)?;
    let claims = state.keys().verify(&token)?;
    Some(Identity {
        account_id: claims.sub,
        username: claims.username,
    })
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = ApiEnvelope),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing and invalid tokens look the same from outside.
    let Some(identity) = authenticate_request(&headers, &auth_state) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match fetch_account(kv.as_ref(), &identity.account_id).await {
        // A live token for a deleted account is still no session.
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Ok(Some(account)) => ok(json!({"user": SessionUser::from(&account)})),
        Err(err) => {
            error!("Failed to load session account: {err}");
            server_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Sessions are self-contained, so logout is purely a client-side discard.
    let mut response = ok_empty();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

/// Build the `HttpOnly` session cookie carrying a freshly issued token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = super::token::SESSION_TTL_SECONDS;
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
