//! Login endpoint with a deliberately uniform failure mode.

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::password::verify_password;
use super::session::session_cookie;
use super::state::AuthState;
use super::storage::{Account, fetch_account_by_email, fetch_account_by_username};
use super::types::{LoginRequest, SessionUser};
use super::utils::{normalize_email, valid_email};
use crate::api::captcha;
use crate::api::handlers::{ApiEnvelope, fail, ok, server_error};
use crate::store::KeyValue;

/// One message for "no such account" and "wrong password" alike, so login
/// cannot be used to probe which usernames or emails exist.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiEnvelope),
        (status = 400, description = "Missing fields or captcha", body = ApiEnvelope),
        (status = 401, description = "Invalid credentials", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn login(
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if !captcha::acceptable(&request.captcha_token) {
        return fail(StatusCode::BAD_REQUEST, "Captcha verification failed");
    }

    let identifier = request.identifier.trim();
    if identifier.is_empty() || request.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Identifier and password required");
    }

    let account = match lookup(kv.as_ref(), identifier).await {
        Ok(account) => account,
        Err(err) => {
            error!("Failed to resolve login identifier: {err}");
            return server_error();
        }
    };
    let Some(account) = account else {
        return fail(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
    };

    if !verify_password(&request.password, &account.password_hash) {
        return fail(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
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

/// Email-shaped identifiers resolve through the email index, everything else
/// through the username index.
async fn lookup(kv: &dyn KeyValue, identifier: &str) -> anyhow::Result<Option<Account>> {
    let as_email = normalize_email(identifier);
    if valid_email(&as_email) {
        fetch_account_by_email(kv, &as_email).await
    } else {
        fetch_account_by_username(kv, identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::password::hash_password;
    use super::super::state::{AdminRoster, AuthConfig};
    use super::super::storage::create_account;
    use super::super::token::SessionKeys;
    use super::*;
    use crate::store::MemoryKv;
    use anyhow::Result;
    use axum::body::to_bytes;
    use secrecy::SecretString;

    fn test_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new("http://localhost:3000".to_string()),
            SessionKeys::new(&SecretString::from("test-key".to_string())),
            AdminRoster::default(),
        ))
    }

    async fn seed_account(kv: &MemoryKv) -> Result<()> {
        let account = Account {
            id: "acc-1".to_string(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: hash_password("secret1", 4)?,
            no_content_audit: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_account(kv, &account).await
    }

    fn request(identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
            captcha_token: "image-captcha-1".to_string(),
        }
    }

    async fn error_body(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        value["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn login_by_username_and_by_email() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv).await?;
        let shared: Arc<dyn KeyValue> = kv;

        for identifier in ["alice", "a@x.com", " A@X.COM "] {
            let response = login(
                Extension(shared.clone()),
                Extension(test_state()),
                Some(Json(request(identifier, "secret1"))),
            )
            .await
            .into_response();
            assert_eq!(response.status(), StatusCode::OK, "identifier {identifier}");
            assert!(response.headers().contains_key(SET_COOKIE));
        }
        Ok(())
    }

    #[tokio::test]
    async fn unknown_account_and_wrong_password_are_indistinguishable() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv).await?;
        let shared: Arc<dyn KeyValue> = kv;

        let wrong_password = login(
            Extension(shared.clone()),
            Extension(test_state()),
            Some(Json(request("alice", "wrong"))),
        )
        .await
        .into_response();
        let unknown_user = login(
            Extension(shared),
            Extension(test_state()),
            Some(Json(request("nobody", "secret1"))),
        )
        .await
        .into_response();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_body(wrong_password).await,
            error_body(unknown_user).await
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_requires_captcha_and_fields() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv).await?;
        let shared: Arc<dyn KeyValue> = kv;

        let mut no_captcha = request("alice", "secret1");
        no_captcha.captcha_token = String::new();
        let response = login(
            Extension(shared.clone()),
            Extension(test_state()),
            Some(Json(no_captcha)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = login(
            Extension(shared),
            Extension(test_state()),
            Some(Json(request("", "secret1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
