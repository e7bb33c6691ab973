//! Note records, ownership sets, and short-link mappings.
//!
//! Key shapes:
//! - `note:{id}` note record (JSON)
//! - `notes:index` set of all note ids
//! - `user:{id}:notes` set of note ids owned by the account
//! - `short:{slug}` -> note id
//!
//! Creation writes the record first and the short link last; deletion removes
//! the short link and memberships before the record. A crash mid-sequence must
//! leave an unreachable record, never a live pointer to a missing one.

use anyhow::{Context, Result};
use tracing::warn;

use super::types::Note;
use crate::store::KeyValue;

pub(crate) const NOTES_INDEX_KEY: &str = "notes:index";

pub(crate) fn note_key(id: &str) -> String {
    format!("note:{id}")
}

pub(crate) fn owner_notes_key(user_id: &str) -> String {
    format!("user:{user_id}:notes")
}

pub(crate) fn short_key(slug: &str) -> String {
    format!("short:{slug}")
}

pub(crate) async fn fetch_note(kv: &dyn KeyValue, id: &str) -> Result<Option<Note>> {
    let Some(raw) = kv.get(&note_key(id)).await? else {
        return Ok(None);
    };
    let note = serde_json::from_str(&raw).context("corrupt note record")?;
    Ok(Some(note))
}

pub(crate) async fn save_note(kv: &dyn KeyValue, note: &Note) -> Result<()> {
    let raw = serde_json::to_string(note).context("serialize note record")?;
    kv.set(&note_key(&note.id), &raw).await
}

/// Resolve a short-link slug to a note id.
pub(crate) async fn resolve_short(kv: &dyn KeyValue, slug: &str) -> Result<Option<String>> {
    kv.get(&short_key(slug)).await
}

/// Write the record, then the owner set, then the global index, then the
/// short link. The slug mapping gates uniqueness checks and goes last.
pub(crate) async fn create_note(kv: &dyn KeyValue, note: &Note) -> Result<()> {
    save_note(kv, note).await?;
    if let Some(user_id) = &note.user_id {
        kv.sadd(&owner_notes_key(user_id), &note.id).await?;
    }
    kv.sadd(NOTES_INDEX_KEY, &note.id).await?;
    if let Some(slug) = &note.short_slug {
        kv.set(&short_key(slug), &note.id).await?;
    }
    Ok(())
}

/// Remove the short link and both memberships first, the record last.
pub(crate) async fn purge_note(kv: &dyn KeyValue, note: &Note) -> Result<()> {
    if let Some(slug) = &note.short_slug {
        kv.del(&short_key(slug)).await?;
    }
    kv.srem(NOTES_INDEX_KEY, &note.id).await?;
    if let Some(user_id) = &note.user_id {
        kv.srem(&owner_notes_key(user_id), &note.id).await?;
    }
    kv.del(&note_key(&note.id)).await?;
    Ok(())
}

/// Owned note ids, unordered.
pub(crate) async fn owner_note_ids(kv: &dyn KeyValue, user_id: &str) -> Result<Vec<String>> {
    kv.smembers(&owner_notes_key(user_id)).await
}

/// Delete every note an account owns, then the owner set itself. Set members
/// without a readable record are still unlinked from the global index.
/// Returns the number of purged records.
pub(crate) async fn purge_account_notes(kv: &dyn KeyValue, user_id: &str) -> Result<usize> {
    let ids = owner_note_ids(kv, user_id).await?;
    let mut purged = 0;
    for id in &ids {
        match fetch_note(kv, id).await {
            Ok(Some(note)) => {
                purge_note(kv, &note).await?;
                purged += 1;
            }
            Ok(None) => {
                kv.srem(NOTES_INDEX_KEY, id).await?;
            }
            Err(err) => {
                warn!("Dropping unreadable note {id} during account purge: {err}");
                kv.srem(NOTES_INDEX_KEY, id).await?;
                kv.del(&note_key(id)).await?;
                purged += 1;
            }
        }
    }
    kv.del(&owner_notes_key(user_id)).await?;
    Ok(purged)
}
