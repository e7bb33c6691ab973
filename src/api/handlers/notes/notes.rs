//! Note CRUD endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rand::{Rng, distributions::Alphanumeric};
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::guard::{authorize_note_read, authorize_note_write};
use super::storage;
use super::types::{CreateNoteRequest, Note, NoteProtection, NoteSummary, NoteView, UpdateNoteRequest};
use crate::api::captcha;
use crate::api::handlers::auth::password::{NOTE_COST, hash_password};
use crate::api::handlers::auth::session::{Identity, authenticate_request};
use crate::api::handlers::auth::state::AuthState;
use crate::api::handlers::auth::storage::fetch_account;
use crate::api::handlers::auth::utils::{new_id, now_rfc3339};
use crate::api::handlers::{ApiEnvelope, fail, ok, ok_empty, server_error};
use crate::api::moderation::ContentModerator;
use crate::store::KeyValue;

const TITLE_MAX_CHARS: usize = 200;
const CONTENT_MAX_BYTES: usize = 50 * 1024;
const GENERATED_SLUG_LEN: usize = 8;

fn valid_slug(slug: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_-]{3,50}$").is_ok_and(|re| re.is_match(slug))
}

fn generate_slug() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SLUG_LEN)
        .map(char::from)
        .collect()
}

/// A flag read failure screens the content normally; it never fails the write.
async fn moderation_exempt(kv: &dyn KeyValue, identity: Option<&Identity>) -> bool {
    let Some(identity) = identity else {
        return false;
    };
    match fetch_account(kv, &identity.account_id).await {
        Ok(Some(account)) => account.no_content_audit,
        Ok(None) => false,
        Err(err) => {
            warn!("Failed to read moderation exemption: {err}");
            false
        }
    }
}

fn moderation_rejection(terms: &[String]) -> Response {
    fail(
        StatusCode::BAD_REQUEST,
        format!("Content contains banned terms: {}", terms.join(", ")),
    )
}

#[utoipa::path(
    post,
    path = "/v1/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 200, description = "Note created", body = ApiEnvelope),
        (status = 400, description = "Invalid input, captcha, or banned content", body = ApiEnvelope),
        (status = 409, description = "Short link already taken", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn create_note(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    moderator: Extension<Arc<dyn ContentModerator>>,
    payload: Option<Json<CreateNoteRequest>>,
) -> impl IntoResponse {
    let request: CreateNoteRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if !captcha::acceptable(&request.captcha_token) {
        return fail(StatusCode::BAD_REQUEST, "Captcha verification failed");
    }

    let title = request.title.trim();
    if title.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Title must not be empty");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return fail(StatusCode::BAD_REQUEST, "Title must be at most 200 characters");
    }
    let content = request.content.trim();
    if content.len() > CONTENT_MAX_BYTES {
        return fail(StatusCode::BAD_REQUEST, "Content must be at most 50 KiB");
    }

    let slug = match request.custom_slug.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => {
            if !valid_slug(custom) {
                return fail(
                    StatusCode::BAD_REQUEST,
                    "Short link must be 3-50 characters of letters, digits, underscore or hyphen",
                );
            }
            match storage::resolve_short(kv.as_ref(), custom).await {
                Ok(Some(_)) => return fail(StatusCode::CONFLICT, "Short link already taken"),
                Ok(None) => custom.to_string(),
                Err(err) => {
                    error!("Failed to check short link availability: {err}");
                    return server_error();
                }
            }
        }
        _ => generate_slug(),
    };

    let identity = authenticate_request(&headers, &auth_state);
    let exempt = moderation_exempt(kv.as_ref(), identity.as_ref()).await;
    if !content.is_empty() && !exempt {
        let verdict = moderator.check(content).await;
        if !verdict.is_valid {
            return moderation_rejection(&verdict.banned_terms);
        }
    }

    let password = match request.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => match hash_password(plain, NOTE_COST) {
            Ok(hash) => Some(NoteProtection::Hashed(hash)),
            Err(err) => {
                error!("Failed to hash note password: {err}");
                return server_error();
            }
        },
        None => None,
    };

    let now = now_rfc3339();
    let note = Note {
        id: new_id(),
        title: title.to_string(),
        content: content.to_string(),
        user_id: identity.map(|identity| identity.account_id),
        password,
        short_slug: Some(slug),
        created_at: now.clone(),
        updated_at: now,
    };

    if let Err(err) = storage::create_note(kv.as_ref(), &note).await {
        error!("Failed to store note: {err}");
        return server_error();
    }

    ok(json!({
        "id": note.id,
        "title": note.title,
        "shortSlug": note.short_slug,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/notes",
    responses(
        (status = 200, description = "Caller's notes, newest first", body = ApiEnvelope),
        (status = 401, description = "Authentication required", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn list_notes(
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(identity) = authenticate_request(&headers, &auth_state) else {
        return fail(StatusCode::UNAUTHORIZED, "Authentication required");
    };

    let ids = match storage::owner_note_ids(kv.as_ref(), &identity.account_id).await {
        Ok(ids) => ids,
        Err(err) => {
            error!("Failed to read owned note set: {err}");
            return server_error();
        }
    };

    let mut summaries = Vec::with_capacity(ids.len());
    for id in &ids {
        match storage::fetch_note(kv.as_ref(), id).await {
            // The set is advisory; the record's own userId decides.
            Ok(Some(note)) if note.user_id.as_deref() == Some(identity.account_id.as_str()) => {
                summaries.push(NoteSummary::from(&note));
            }
            Ok(_) => {}
            Err(err) => {
                error!("Failed to load note {id}: {err}");
                return server_error();
            }
        }
    }

    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ok(json!(summaries))
}

#[utoipa::path(
    get,
    path = "/v1/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note, with the body gated for non-owners of protected notes", body = ApiEnvelope),
        (status = 404, description = "Note not found", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn get_note(
    Path(id): Path<String>,
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let note = match storage::fetch_note(kv.as_ref(), &id).await {
        Ok(Some(note)) => note,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Note not found"),
        Err(err) => {
            error!("Failed to load note: {err}");
            return server_error();
        }
    };

    let identity = authenticate_request(&headers, &auth_state);
    let access = authorize_note_read(&note, identity.as_ref());
    ok(json!(NoteView::new(&note, access.is_owner, access.body_visible)))
}

#[utoipa::path(
    put,
    path = "/v1/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = ApiEnvelope),
        (status = 401, description = "Authentication required", body = ApiEnvelope),
        (status = 403, description = "Not the owner", body = ApiEnvelope),
        (status = 404, description = "Note not found", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn update_note(
    Path(id): Path<String>,
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
    moderator: Extension<Arc<dyn ContentModerator>>,
    payload: Option<Json<UpdateNoteRequest>>,
) -> impl IntoResponse {
    let Some(identity) = authenticate_request(&headers, &auth_state) else {
        return fail(StatusCode::UNAUTHORIZED, "Authentication required");
    };
    let request: UpdateNoteRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let mut note = match storage::fetch_note(kv.as_ref(), &id).await {
        Ok(Some(note)) => note,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Note not found"),
        Err(err) => {
            error!("Failed to load note: {err}");
            return server_error();
        }
    };

    if !authorize_note_write(&note, Some(&identity)) {
        return fail(StatusCode::FORBIDDEN, "No permission to modify this note");
    }

    let title = match request.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => note.title.clone(),
    };
    if title.chars().count() > TITLE_MAX_CHARS {
        return fail(StatusCode::BAD_REQUEST, "Title must be at most 200 characters");
    }
    let content = match request.content.as_deref() {
        Some(content) => content.trim().to_string(),
        None => note.content.clone(),
    };
    if content.len() > CONTENT_MAX_BYTES {
        return fail(StatusCode::BAD_REQUEST, "Content must be at most 50 KiB");
    }

    let exempt = moderation_exempt(kv.as_ref(), Some(&identity)).await;
    if !content.is_empty() && !exempt {
        let verdict = moderator.check(&content).await;
        if !verdict.is_valid {
            return moderation_rejection(&verdict.banned_terms);
        }
    }

    let protection = match request.password.as_deref().map(str::trim) {
        // Untouched, but pre-hashing records migrate on any owner write.
        None => match note.password.take() {
            Some(NoteProtection::Plaintext(plain)) => match hash_password(&plain, NOTE_COST) {
                Ok(hash) => Some(NoteProtection::Hashed(hash)),
                Err(err) => {
                    error!("Failed to migrate note password: {err}");
                    return server_error();
                }
            },
            other => other,
        },
        Some("") => None,
        Some(plain) => match hash_password(plain, NOTE_COST) {
            Ok(hash) => Some(NoteProtection::Hashed(hash)),
            Err(err) => {
                error!("Failed to hash note password: {err}");
                return server_error();
            }
        },
    };

    note.title = title;
    note.content = content;
    note.password = protection;
    note.updated_at = now_rfc3339();

    if let Err(err) = storage::save_note(kv.as_ref(), &note).await {
        error!("Failed to persist note update: {err}");
        return server_error();
    }

    ok(json!(NoteView::new(&note, true, true)))
}

#[utoipa::path(
    delete,
    path = "/v1/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted", body = ApiEnvelope),
        (status = 401, description = "Authentication required", body = ApiEnvelope),
        (status = 403, description = "Not the owner", body = ApiEnvelope),
        (status = 404, description = "Note not found", body = ApiEnvelope)
    ),
    tag = "notes"
)]
pub async fn delete_note(
    Path(id): Path<String>,
    headers: HeaderMap,
    kv: Extension<Arc<dyn KeyValue>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(identity) = authenticate_request(&headers, &auth_state) else {
        return fail(StatusCode::UNAUTHORIZED, "Authentication required");
    };

    let note = match storage::fetch_note(kv.as_ref(), &id).await {
        Ok(Some(note)) => note,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "Note not found"),
        Err(err) => {
            error!("Failed to load note: {err}");
            return server_error();
        }
    };

    if !authorize_note_write(&note, Some(&identity)) {
        return fail(StatusCode::FORBIDDEN, "No permission to delete this note");
    }

    if let Err(err) = storage::purge_note(kv.as_ref(), &note).await {
        error!("Failed to delete note: {err}");
        return server_error();
    }

    ok_empty()
}
