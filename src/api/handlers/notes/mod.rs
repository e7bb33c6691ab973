//! Note CRUD, access control, and sharing.
//!
//! Notes may be created anonymously; ownership is fixed at creation time.
//! Reads expose existence and the protection flag to everyone and withhold
//! only the body; writes require the owner. Protected bodies unlock through
//! the per-note password gate in [`password`], and [`short`] resolves public
//! share slugs.

pub(crate) mod guard;
pub(crate) mod notes;
pub(crate) mod password;
pub(crate) mod short;
pub(crate) mod storage;
pub(crate) mod types;

pub(crate) use storage::purge_account_notes;
