//! Account flows driven end to end through the assembled router.
//!
//! Every test talks HTTP to the same [`Router`] the binary serves and keeps a
//! handle on the in-memory store, which doubles as the mailbox: the code a
//! user would receive by email is read straight from its storage key.

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, RETRY_AFTER, SET_COOKIE},
    },
    response::Response,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use vellum::api::email::LogEmailSender;
use vellum::api::moderation::DisabledModerator;
use vellum::api::{AdminRoster, AuthConfig, AuthState, SessionKeys};
use vellum::store::{KeyValue, MemoryKv};

const CAPTCHA_PROOF: &str = "image-captcha-93ab41";

fn test_app(kv: &Arc<MemoryKv>, operator_ids: &[&str]) -> Result<Router> {
    let state = Arc::new(AuthState::new(
        AuthConfig::new("http://localhost:3000".to_string()),
        SessionKeys::new(&SecretString::from("integration-test-key".to_string())),
        AdminRoster::new(operator_ids.iter().copied()),
    ));
    let store: Arc<dyn KeyValue> = kv.clone();
    vellum::api::app(
        store,
        state,
        Arc::new(LogEmailSender),
        Arc::new(DisabledModerator),
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Option<Value>,
) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(COOKIE, format!("auth-token={token}"));
    }
    let request = match payload {
        Some(payload) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(request).await?)
}

async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn session_token(response: &Response) -> Option<String> {
    let cookie = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    let token = cookie.strip_prefix("auth-token=")?.split(';').next()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn stored_code(kv: &MemoryKv, purpose: &str, email: &str) -> Result<String> {
    kv.get(&format!("verification:{purpose}:{email}"))
        .await?
        .with_context(|| format!("no stored {purpose} code for {email}"))
}

/// Request a code, read it from the store, and confirm it.
async fn earn_exchange_token(
    app: &Router,
    kv: &MemoryKv,
    purpose: &str,
    email: &str,
) -> Result<String> {
    let response = send(
        app,
        "POST",
        "/v1/auth/verification",
        None,
        Some(json!({"email": email, "purpose": purpose})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let code = stored_code(kv, purpose, email).await?;
    let response = send(
        app,
        "POST",
        "/v1/auth/verification/confirm",
        None,
        Some(json!({"email": email, "purpose": purpose, "code": code})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    Ok(body["data"]["exchangeToken"]
        .as_str()
        .context("exchange token in confirm response")?
        .to_string())
}

/// Full signup: verification dance plus the register call. Returns the new
/// account id and a session token.
async fn register_user(
    app: &Router,
    kv: &MemoryKv,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(String, String)> {
    let exchange_token = earn_exchange_token(app, kv, "register", email).await?;
    let response = send(
        app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": password,
            "exchangeToken": exchange_token,
            "captchaToken": CAPTCHA_PROOF,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let token = session_token(&response).context("session cookie on register")?;
    let body = body_json(response).await?;
    let account_id = body["data"]["user"]["id"]
        .as_str()
        .context("account id in register response")?
        .to_string();
    Ok((account_id, token))
}

async fn login(app: &Router, identifier: &str, password: &str) -> Result<Response> {
    send(
        app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({
            "identifier": identifier,
            "password": password,
            "captchaToken": CAPTCHA_PROOF,
        })),
    )
    .await
}

#[tokio::test]
async fn registration_flow_issues_a_working_session() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;

    // 1. Verified email, then account, then cookie.
    let (account_id, token) =
        register_user(&app, &kv, "alice", "alice@example.com", "secret1").await?;

    // 2. The cookie resolves to the fresh account, credentials stripped.
    let response = send(&app, "GET", "/v1/auth/session", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["data"]["user"]["id"], json!(account_id));
    assert_eq!(body["data"]["user"]["username"], json!("alice"));
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // 3. The same token authenticates as a bearer header.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/auth/session")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // 4. Logout clears the cookie; anonymous probes see no session.
    let response = send(&app, "POST", "/v1/auth/logout", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .context("clear cookie")?
        .to_str()?;
    assert!(cleared.starts_with("auth-token=;"));
    assert!(cleared.contains("Max-Age=0"));

    let response = send(&app, "GET", "/v1/auth/session", None, None).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resend_is_rate_limited_until_the_cooldown_lapses() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    let payload = json!({"email": "codes@example.com", "purpose": "register"});

    let response = send(&app, "POST", "/v1/auth/verification", None, Some(payload.clone())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // An immediate retry hits the per-email cooldown.
    let response = send(&app, "POST", "/v1/auth/verification", None, Some(payload.clone())).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .context("Retry-After header")?;
    assert_eq!(retry_after.to_str()?, "60");

    tokio::time::advance(Duration::from_secs(61)).await;
    let response = send(&app, "POST", "/v1/auth/verification", None, Some(payload)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn verification_codes_are_single_use() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    let email = "codes@example.com";

    let response = send(
        &app,
        "POST",
        "/v1/auth/verification",
        None,
        Some(json!({"email": email, "purpose": "register"})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let code = stored_code(&kv, "register", email).await?;

    // A wrong guess neither confirms nor burns the stored code.
    let response = send(
        &app,
        "POST",
        "/v1/auth/verification/confirm",
        None,
        Some(json!({"email": email, "purpose": "register", "code": "not-the-code"})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/v1/auth/verification/confirm",
        None,
        Some(json!({"email": email, "purpose": "register", "code": code})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The match burned it; the same code cannot confirm twice.
    let response = send(
        &app,
        "POST",
        "/v1/auth/verification/confirm",
        None,
        Some(json!({"email": email, "purpose": "register", "code": code})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn a_register_exchange_token_is_single_use() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    let email = "once@example.com";
    let exchange_token = earn_exchange_token(&app, &kv, "register", email).await?;

    let register = |username: &str, token: &str| {
        json!({
            "username": username,
            "email": email,
            "password": "secret1",
            "exchangeToken": token,
            "captchaToken": CAPTCHA_PROOF,
        })
    };

    // A forged token never mints an account and leaves the real one intact.
    let response = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(register("mallory", "forged-token")),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(register("alice", &exchange_token)),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Consumed on success: the replay fails on the token, not on uniqueness.
    let response = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(register("alice2", &exchange_token)),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_username_and_email_are_conflicts() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    register_user(&app, &kv, "alice", "alice@example.com", "secret1").await?;

    // 1. The taken username under a freshly verified other email.
    let token = earn_exchange_token(&app, &kv, "register", "other@example.com").await?;
    let response = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "secret1",
            "exchangeToken": token,
            "captchaToken": CAPTCHA_PROOF,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await?["error"], json!("Username already taken"));

    // 2. A fresh verification for the email already on file.
    tokio::time::advance(Duration::from_secs(61)).await;
    let token = earn_exchange_token(&app, &kv, "register", "alice@example.com").await?;
    let response = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "secret1",
            "exchangeToken": token,
            "captchaToken": CAPTCHA_PROOF,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await?["error"],
        json!("Email already registered")
    );
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    register_user(&app, &kv, "alice", "alice@example.com", "secret1").await?;

    // A wrong password and an unknown identifier produce the same answer.
    let mut denials = Vec::new();
    for (identifier, password) in [("alice", "wrong-pass"), ("nobody", "secret1")] {
        let response = login(&app, identifier, password).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        denials.push(body_json(response).await?["error"].clone());
    }
    assert_eq!(denials[0], denials[1]);
    assert_eq!(denials[0], json!("Invalid credentials"));

    // The email works as an identifier too.
    let response = login(&app, "alice@example.com", "secret1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_token(&response).is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn password_reset_rotates_the_credential() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    register_user(&app, &kv, "alice", "alice@example.com", "secret1").await?;

    // 1. Earn a reset exchange token once the resend cooldown lapses.
    tokio::time::advance(Duration::from_secs(61)).await;
    let exchange_token = earn_exchange_token(&app, &kv, "reset", "alice@example.com").await?;

    // 2. Rotate the password; no session is minted for an unauthenticated reset.
    let response = send(
        &app,
        "POST",
        "/v1/auth/password/reset",
        None,
        Some(json!({
            "email": "alice@example.com",
            "newPassword": "rotated9",
            "exchangeToken": exchange_token,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());

    // 3. Old password out, new password in.
    let response = login(&app, "alice", "secret1").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(&app, "alice", "rotated9").await?;
    assert_eq!(response.status(), StatusCode::OK);

    // 4. The exchange token cannot be replayed.
    let response = send(
        &app,
        "POST",
        "/v1/auth/password/reset",
        None,
        Some(json!({
            "email": "alice@example.com",
            "newPassword": "rotated10",
            "exchangeToken": exchange_token,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = login(&app, "alice", "rotated9").await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn deactivation_cascades_to_notes_and_indices() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;
    let (account_id, token) =
        register_user(&app, &kv, "alice", "alice@example.com", "secret1").await?;

    // A note owned by the account, reachable through its short link.
    let response = send(
        &app,
        "POST",
        "/v1/notes",
        Some(&token),
        Some(json!({
            "title": "keepsake",
            "content": "gone with the account",
            "customSlug": "keepsake",
            "captchaToken": CAPTCHA_PROOF,
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let note_id = body_json(response).await?["data"]["id"]
        .as_str()
        .context("note id")?
        .to_string();

    // The confirmation phrase is matched exactly.
    let response = send(
        &app,
        "POST",
        "/v1/auth/deactivate",
        Some(&token),
        Some(json!({"password": "secret1", "confirmation": "Delete my account"})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/v1/auth/deactivate",
        Some(&token),
        Some(json!({"password": "secret1", "confirmation": "delete my account"})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Session, login indices, the note, and its short link are all gone.
    let response = send(&app, "GET", "/v1/auth/session", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = login(&app, "alice", "secret1").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", &format!("/v1/notes/{note_id}"), None, None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/v1/short/keepsake", None, None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(kv.get(&format!("user:{account_id}")).await?, None);
    assert_eq!(kv.get("user:username:alice").await?, None);
    assert_eq!(kv.get("user:email:alice@example.com").await?, None);
    Ok(())
}

#[tokio::test]
async fn operator_endpoints_gate_on_the_roster() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());

    // The roster is fixed at startup, so mint the accounts first and rebuild
    // the router with the operator's id on the list. Same signing key, so the
    // session tokens stay valid.
    let bootstrap = test_app(&kv, &[])?;
    let (operator_id, operator_token) =
        register_user(&bootstrap, &kv, "root", "root@example.com", "secret1").await?;
    let (_, member_token) =
        register_user(&bootstrap, &kv, "bob", "bob@example.com", "secret1").await?;
    let app = test_app(&kv, &[operator_id.as_str()])?;

    // 1. Anonymous and non-operator callers are turned away.
    let response = send(&app, "GET", "/v1/admin/audit?query=bob", None, None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/v1/admin/audit?query=bob", Some(&member_token), None).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await?["error"],
        json!("Operator access required")
    );

    // 2. The operator flips the exemption flag by username and reads it back.
    let response = send(
        &app,
        "POST",
        "/v1/admin/audit",
        Some(&operator_token),
        Some(json!({"query": "bob", "noContentAudit": true})),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "GET",
        "/v1/admin/audit?query=bob",
        Some(&operator_token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["data"]["user"]["username"], json!("bob"));
    assert_eq!(body["data"]["user"]["noContentAudit"], json!(true));
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // 3. Unknown targets are a 404, not an empty success.
    let response = send(
        &app,
        "GET",
        "/v1/admin/audit?query=ghost",
        Some(&operator_token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn health_reports_the_running_build() -> Result<()> {
    let kv = Arc::new(MemoryKv::new());
    let app = test_app(&kv, &[])?;

    let response = send(&app, "GET", "/health", None, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    // Responses carry a request id even when the caller sends none.
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await?;
    assert_eq!(body["name"], json!("vellum"));
    assert_eq!(body["store"], json!("ok"));
    Ok(())
}
