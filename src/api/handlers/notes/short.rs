//! Public short-link resolution.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::storage;
use crate::api::handlers::{ApiEnvelope, fail, ok, server_error};
use crate::store::KeyValue;

#[utoipa::path(
    get,
    path = "/v1/short/{slug}",
    params(("slug" = String, Path, description = "Short-link slug")),
    responses(
        (status = 200, description = "Note id behind the slug", body = ApiEnvelope),
        (status = 404, description = "No note claims the slug", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn resolve_short(
    Path(slug): Path<String>,
    kv: Extension<Arc<dyn KeyValue>>,
) -> impl IntoResponse {
    // Resolution only maps the slug; fetching the note (and its protection
    // gate) stays with the notes endpoint.
    match storage::resolve_short(kv.as_ref(), &slug).await {
        Ok(Some(note_id)) => ok(json!({"noteId": note_id})),
        Ok(None) => fail(StatusCode::NOT_FOUND, "Short link not found"),
        Err(err) => {
            error!("Failed to resolve short link: {err}");
            server_error()
        }
    }
}
