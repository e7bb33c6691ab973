//! Read and write authorization for notes.

use super::types::{Note, NoteProtection};
use crate::api::handlers::auth::password::verify_password;
use crate::api::handlers::auth::session::Identity;

/// What a read request may see. Existence and the protection flag are visible
/// to every requester; only the body is ever withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadAccess {
    pub is_owner: bool,
    pub body_visible: bool,
}

/// Ownerless notes are world-readable. The owner bypasses protection; any
/// other requester gets metadata with the body held back until the note
/// password is verified.
pub(crate) fn authorize_note_read(note: &Note, identity: Option<&Identity>) -> ReadAccess {
    let is_owner = matches_owner(note, identity);
    let body_visible = is_owner || note.user_id.is_none() || note.password.is_none();
    ReadAccess {
        is_owner,
        body_visible,
    }
}

/// Writes need a matching owner; anonymous notes are never writable.
pub(crate) fn authorize_note_write(note: &Note, identity: Option<&Identity>) -> bool {
    matches_owner(note, identity)
}

fn matches_owner(note: &Note, identity: Option<&Identity>) -> bool {
    match (&note.user_id, identity) {
        (Some(owner), Some(identity)) => *owner == identity.account_id,
        _ => false,
    }
}

/// Dispatch on the stored form: bcrypt for hashed values, string equality for
/// legacy plaintext.
pub(crate) fn protection_matches(protection: &NoteProtection, candidate: &str) -> bool {
    match protection {
        NoteProtection::Hashed(hash) => verify_password(candidate, hash),
        NoteProtection::Plaintext(stored) => stored == candidate,
    }
}
