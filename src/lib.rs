//! # Vellum (Accounts & Note Access Control)
//!
//! `vellum` is the account and access-control authority for a hosted
//! note-taking service. It owns registration, login, password reset, account
//! deactivation, and every decision about who may read or change a note.
//!
//! ## Accounts & Sessions
//!
//! Credentials are bcrypt hashes; registration and password reset are gated by
//! a short-lived emailed verification code that is exchanged for a single-use
//! token. A successful login issues a self-contained signed session valid for
//! seven days, delivered as an `HttpOnly` cookie (bearer tokens are accepted
//! equivalently). Sessions are stateless: nothing is revoked server-side, so
//! logout simply clears the cookie.
//!
//! - **Enumeration resistance:** login failures return one generic message
//!   whether the account is missing or the password is wrong.
//! - **Ordered writes:** the backing store has no transactions, so multi-key
//!   mutations write the gating index last on create and delete it first on
//!   teardown.
//!
//! ## Notes
//!
//! Every note names its owner. Writes require the owning session; reads are
//! open but a password-protected note withholds its body until the caller
//! proves the password or owns the note. Short links resolve a slug to a note
//! id without granting anything else.
//!
//! ## Operators
//!
//! A fixed allow-list of operator account ids may flip a per-account audit
//! exemption flag and look accounts up by id or username. Everyone else gets
//! `403 Forbidden`.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
