//! Operator-only endpoints for the moderation-exemption flag.
//!
//! Operators are a fixed allow-list of account ids handed to the server at
//! startup. There is no in-band elevation: a session either belongs to an
//! operator or it does not.

use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use super::auth::session::{Identity, authenticate_request};
use super::auth::state::AuthState;
use super::auth::storage::{Account, fetch_account, fetch_account_by_username, save_account};
use super::auth::types::SessionUser;
use super::auth::utils::now_rfc3339;
use super::{ApiEnvelope, fail, ok, ok_empty, server_error};
use crate::store::KeyValue;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetAuditFlagRequest {
    /// Account id or username.
    pub query: String,
    pub no_content_audit: bool,
}

#[derive(Deserialize, Debug)]
pub struct AuditLookupQuery {
    pub query: String,
}

fn require_operator(headers: &HeaderMap, state: &AuthState) -> Result<Identity, Response> {
    let Some(identity) = authenticate_request(headers, state) else {
        return Err(fail(StatusCode::UNAUTHORIZED, "Not signed in"));
    };
    if !state.admins().is_operator(&identity.account_id) {
        return Err(fail(StatusCode::FORBIDDEN, "Operator access required"));
    }
    Ok(identity)
}

/// Account id first, username as fallback.
async fn resolve_target(kv: &dyn KeyValue, query: &str) -> anyhow::Result<Option<Account>> {
    if let Some(account) = fetch_account(kv, query).await? {
        return Ok(Some(account));
    }
    fetch_account_by_username(kv, query).await
}

#[utoipa::path(
    post,
    path = "/v1/admin/audit",
    request_body = SetAuditFlagRequest,
    responses(
        (status = 200, description = "Flag updated", body = ApiEnvelope),
        (status = 401, description = "No active session", body = ApiEnvelope),
        (status = 403, description = "Caller is not an operator", body = ApiEnvelope),
        (status = 404, description = "No such account", body = ApiEnvelope)
    ),
    tag = "admin"
)]
pub async fn set_audit_flag(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SetAuditFlagRequest>>,
) -> impl IntoResponse {
    let operator = match require_operator(&headers, &auth_state) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let request: SetAuditFlagRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };
    if request.query.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Account id or username required");
    }

    let mut account = match resolve_target(kv.as_ref(), request.query.trim()).await {
        Ok(Some(account)) => account,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Account not found"),
        Err(err) => {
            error!("Failed to resolve audit target: {err}");
            return server_error();
        }
    };

    account.no_content_audit = request.no_content_audit;
    account.updated_at = now_rfc3339();
    if let Err(err) = save_account(kv.as_ref(), &account).await {
        error!("Failed to persist audit flag: {err}");
        return server_error();
    }

    info!(
        operator_id = %operator.account_id,
        account_id = %account.id,
        no_content_audit = account.no_content_audit,
        "audit flag updated"
    );
    ok_empty()
}

#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    params(("query" = String, Query, description = "Account id or username")),
    responses(
        (status = 200, description = "Account with credential material stripped", body = ApiEnvelope),
        (status = 401, description = "No active session", body = ApiEnvelope),
        (status = 403, description = "Caller is not an operator", body = ApiEnvelope),
        (status = 404, description = "No such account", body = ApiEnvelope)
    ),
    tag = "admin"
)]
pub async fn lookup_account(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    query: Option<Query<AuditLookupQuery>>,
) -> impl IntoResponse {
    if let Err(response) = require_operator(&headers, &auth_state) {
        return response;
    }

    let Some(Query(lookup)) = query else {
        return fail(StatusCode::BAD_REQUEST, "Account id or username required");
    };
    if lookup.query.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Account id or username required");
    }

    match resolve_target(kv.as_ref(), lookup.query.trim()).await {
        Ok(Some(account)) => ok(json!({"user": SessionUser::from(&account)})),
        Ok(None) => fail(StatusCode::NOT_FOUND, "Account not found"),
        Err(err) => {
            error!("Failed to resolve audit lookup: {err}");
            server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::auth::password::hash_password;
    use super::super::auth::state::{AdminRoster, AuthConfig};
    use super::super::auth::storage::create_account;
    use super::super::auth::token::SessionKeys;
    use super::*;
    use crate::store::MemoryKv;
    use anyhow::Result;
    use axum::body::to_bytes;
    use axum::http::{HeaderValue, header::AUTHORIZATION};
    use secrecy::SecretString;
    use serde_json::Value;

    fn test_state(operator_ids: &[&str]) -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new("http://localhost:3000".to_string()),
            SessionKeys::new(&SecretString::from("test-key".to_string())),
            AdminRoster::new(operator_ids.iter().copied()),
        ))
    }

    async fn seed_account(kv: &MemoryKv, id: &str, username: &str) -> Result<Account> {
        let account = Account {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password("secret1", 4)?,
            no_content_audit: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_account(kv, &account).await?;
        Ok(account)
    }

    fn bearer(state: &AuthState, id: &str, username: &str) -> Result<HeaderMap> {
        let token = state.keys().issue(id, username)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        Ok(headers)
    }

    #[tokio::test]
    async fn non_operators_are_forbidden() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv, "acc-1", "alice").await?;
        let state = test_state(&["op-1"]);
        let shared: Arc<dyn KeyValue> = kv.clone();

        let response = set_audit_flag(
            bearer(&state, "acc-1", "alice")?,
            Extension(shared.clone()),
            Extension(state.clone()),
            Some(Json(SetAuditFlagRequest {
                query: "alice".to_string(),
                no_content_audit: true,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = lookup_account(
            HeaderMap::new(),
            Extension(shared),
            Extension(state),
            Some(Query(AuditLookupQuery {
                query: "alice".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn flag_set_by_username_persists() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv, "op-1", "root").await?;
        let target = seed_account(&kv, "acc-2", "bob").await?;
        let state = test_state(&["op-1"]);
        let shared: Arc<dyn KeyValue> = kv.clone();

        let response = set_audit_flag(
            bearer(&state, "op-1", "root")?,
            Extension(shared),
            Extension(state),
            Some(Json(SetAuditFlagRequest {
                query: "bob".to_string(),
                no_content_audit: true,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = fetch_account(kv.as_ref(), &target.id).await?.expect("account");
        assert!(updated.no_content_audit);
        assert_ne!(updated.updated_at, target.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_resolves_id_and_username() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv, "op-1", "root").await?;
        seed_account(&kv, "acc-2", "bob").await?;
        let state = test_state(&["op-1"]);
        let shared: Arc<dyn KeyValue> = kv.clone();

        for query in ["acc-2", "bob"] {
            let response = lookup_account(
                bearer(&state, "op-1", "root")?,
                Extension(shared.clone()),
                Extension(state.clone()),
                Some(Query(AuditLookupQuery {
                    query: query.to_string(),
                })),
            )
            .await
            .into_response();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await?;
            let body: Value = serde_json::from_slice(&bytes)?;
            assert_eq!(body["data"]["user"]["id"], Value::from("acc-2"));
            assert!(body["data"]["user"].get("passwordHash").is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() -> Result<()> {
        let kv = Arc::new(MemoryKv::new());
        seed_account(&kv, "op-1", "root").await?;
        let state = test_state(&["op-1"]);
        let shared: Arc<dyn KeyValue> = kv.clone();

        let response = lookup_account(
            bearer(&state, "op-1", "root")?,
            Extension(shared),
            Extension(state),
            Some(Query(AuditLookupQuery {
                query: "nobody".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
