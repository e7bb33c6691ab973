//! Note records and wire shapes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored protection value. `Plaintext` survives from records written before
/// hashing existed; it is rewritten to `Hashed` on the next owner write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NoteProtection {
    Hashed(String),
    Plaintext(String),
}

/// Stored note record at `note:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Absent on legacy anonymous notes, which are world-readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<NoteProtection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_slug: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Note {
    pub(crate) fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub custom_slug: Option<String>,
    pub captcha_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    /// Absent or empty keeps the current title.
    #[serde(default)]
    pub title: Option<String>,
    /// Absent keeps the current body; an empty string clears it.
    #[serde(default)]
    pub content: Option<String>,
    /// Absent keeps the current protection, an empty string removes it,
    /// anything else becomes the new password.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyNotePasswordRequest {
    pub password: String,
    pub captcha_token: String,
}

/// Owner-list entry; never carries the body or password material.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_slug: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            has_password: note.has_password(),
            short_slug: note.short_slug.clone(),
            created_at: note.created_at.clone(),
            updated_at: note.updated_at.clone(),
        }
    }
}

/// Single-note response. `content` is empty while the protection gate is shut.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub is_owner: bool,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_slug: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl NoteView {
    pub(crate) fn new(note: &Note, is_owner: bool, body_visible: bool) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: if body_visible {
                note.content.clone()
            } else {
                String::new()
            },
            is_owner,
            has_password: note.has_password(),
            short_slug: note.short_slug.clone(),
            created_at: note.created_at.clone(),
            updated_at: note.updated_at.clone(),
        }
    }
}
