//! Password gate for protected notes.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::guard::protection_matches;
use super::storage::fetch_note;
use super::types::VerifyNotePasswordRequest;
use crate::api::captcha;
use crate::api::handlers::{ApiEnvelope, fail, ok_empty, server_error};
use crate::store::KeyValue;

#[utoipa::path(
    post,
    path = "/v1/notes/{id}/verify",
    params(("id" = String, Path, description = "Note id")),
    request_body = VerifyNotePasswordRequest,
    responses(
        (status = 200, description = "Password matches; the body may be shown", body = ApiEnvelope),
        (status = 400, description = "Missing password, bad captcha, or note has no password", body = ApiEnvelope),
        (status = 401, description = "Password does not match", body = ApiEnvelope),
        (status = 404, description = "Note not found", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn verify_note_password(
    Path(id): Path<String>,
    kv: Extension<Arc<dyn KeyValue>>,
    payload: Option<Json<VerifyNotePasswordRequest>>,
) -> impl IntoResponse {
    let request: VerifyNotePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if request.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Password must not be empty");
    }
    if !captcha::acceptable(&request.captcha_token) {
        return fail(StatusCode::BAD_REQUEST, "Captcha verification required");
    }

    let note = match fetch_note(kv.as_ref(), &id).await {
        Ok(Some(note)) => note,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Note not found"),
        Err(err) => {
            error!("Failed to load note for verification: {err}");
            return server_error();
        }
    };

    let Some(protection) = &note.password else {
        return fail(StatusCode::BAD_REQUEST, "This note has no password");
    };

    // A mismatch leaves the gate shut; the caller may retry.
    if protection_matches(protection, &request.password) {
        ok_empty()
    } else {
        fail(StatusCode::UNAUTHORIZED, "Password is incorrect")
    }
}
