//! Account, session, and verification handlers.
//!
//! Flows in this module:
//!
//! - **Verification**: a 6-digit emailed code is exchanged for a short-lived
//!   single-use token that then gates `register` and `password/reset`.
//! - **Register / login**: bcrypt credentials, both guarded by a captcha
//!   proof; success issues a self-contained 7-day session token delivered as
//!   an `HttpOnly` cookie (bearer equally accepted).
//! - **Deactivate**: typed-phrase plus password confirmation, then an ordered
//!   teardown of indices, notes, and the account record.
//!
//! Sessions are stateless: logout clears the cookie, nothing is revoked
//! server-side.

pub(crate) mod deactivate;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod register;
pub(crate) mod reset;
pub(crate) mod session;
pub(crate) mod state;
pub(crate) mod storage;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod utils;
pub(crate) mod verification;

pub use state::{AdminRoster, AuthConfig, AuthState};
pub use token::{DEV_SIGNING_KEY, SessionKeys};
