//! Account deactivation: a destructive cascade gated on the current password
//! and a typed confirmation phrase.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info};

use super::password::verify_password;
use super::session::{authenticate_request, clear_session_cookie};
use super::state::AuthState;
use super::storage::{fetch_account, remove_account_record, remove_login_indices};
use super::types::DeactivateRequest;
use crate::api::handlers::notes::purge_account_notes;
use crate::api::handlers::{ApiEnvelope, fail, ok_empty, server_error};
use crate::store::KeyValue;

/// The exact phrase the caller must type; the UI never pre-fills it.
const CONFIRMATION_PHRASE: &str = "delete my account";

#[utoipa::path(
    post,
    path = "/v1/auth/deactivate",
    request_body = DeactivateRequest,
    responses(
        (status = 200, description = "Account and owned notes deleted", body = ApiEnvelope),
        (status = 400, description = "Wrong password or confirmation phrase", body = ApiEnvelope),
        (status = 401, description = "No active session", body = ApiEnvelope)
    ),
    tag = "auth"
)]
pub async fn deactivate(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<DeactivateRequest>>,
) -> impl IntoResponse {
    let Some(identity) = authenticate_request(&headers, &auth_state) else {
        return fail(StatusCode::UNAUTHORIZED, "Not signed in");
    };

    let request: DeactivateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if request.confirmation != CONFIRMATION_PHRASE {
        return fail(
            StatusCode::BAD_REQUEST,
            "Type the confirmation phrase exactly to continue",
        );
    }

    let account = match fetch_account(kv.as_ref(), &identity.account_id).await {
        Ok(Some(account)) => account,
        // Token outlived the account; nothing left to deactivate.
        Ok(None) => return fail(StatusCode::UNAUTHORIZED, "Not signed in"),
        Err(err) => {
            error!("Failed to load account for deactivation: {err}");
            return server_error();
        }
    };

    if !verify_password(&request.password, &account.password_hash) {
        return fail(StatusCode::BAD_REQUEST, "Password is incorrect");
    }

    // Ordered, non-transactional teardown: login indices go first so the
    // account stops resolving immediately, the record itself goes last. A
    // crash mid-sequence strands unreachable data, never a live index.
    if let Err(err) = remove_login_indices(kv.as_ref(), &account).await {
        error!("Failed to drop login indices for {}: {err}", account.id);
        return server_error();
    }
    let purged = match purge_account_notes(kv.as_ref(), &account.id).await {
        Ok(count) => count,
        Err(err) => {
            error!("Failed to purge notes for {}: {err}", account.id);
            return server_error();
        }
    };
    if let Err(err) = remove_account_record(kv.as_ref(), &account.id).await {
        error!("Failed to remove account record {}: {err}", account.id);
        return server_error();
    }

    info!(
        account_id = %account.id,
        notes_purged = purged,
        "account deactivated"
    );

    let mut response = ok_empty();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}
