//! # Accountd (user accounts with server-side sessions)
//!
//! `accountd` registers accounts, authenticates them with email and password,
//! and keeps a server-side session for later requests.
//!
//! ## Credentials
//!
//! Passwords are hashed with Argon2id before they reach the user store. Only
//! the PHC string is persisted; the plaintext never outlives the request.
//!
//! ## Sessions
//!
//! The client holds an opaque token in the `accountd_session` cookie. The
//! session store only ever sees a SHA-256 hash of that token. Sessions have a
//! fixed lifetime (24 hours by default) and are renewed, which discards the
//! previous token, on every signin and logout to prevent session fixation.
//!
//! A session is authenticated when it carries a non-empty `user_id` value.
//! Protected routes sit behind [`session::gate::require_session`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod session;
pub mod store;

pub use error::{Error, ErrorKind, Result};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
