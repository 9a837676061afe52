//! User persistence.
//!
//! [`UserStore`] is the contract the authentication service depends on.
//! [`PgUserStore`] backs it with Postgres; [`MemoryUserStore`] keeps users in
//! memory for tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::{PgPoolSettings, PgUserStore};

use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// A stored account. `password_hash` is always an Argon2 PHC string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields needed to create a user; the store assigns the id.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// # Errors
    /// `Conflict` when the email is taken, `Internal` for any other failure.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// # Errors
    /// `NotFound` when no user has this email, `Internal` for any other failure.
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// # Errors
    /// Returns an error if the backing store is unreachable.
    async fn ping(&self) -> Result<()>;
}
