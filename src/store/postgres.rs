//! Postgres-backed user store.

use super::{NewUser, User, UserStore};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};

/// Bounds for the Postgres connection pool.
#[derive(Clone, Debug)]
pub struct PgPoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PgPoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10 * 60),
            max_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

impl PgPoolSettings {
    /// Connect a pool using these bounds.
    ///
    /// # Errors
    /// Returns an error if the initial connection fails.
    pub async fn connect(&self, dsn: &str) -> std::result::Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(true)
            .connect(dsn)
            .await
    }
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let query = r"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::conflict("user already exists").with_source(err)
                } else {
                    Error::internal("database error").with_source(err)
                }
            })?;

        Ok(User {
            id: row.try_get("id").map_err(decode_error)?,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let query = "SELECT id, username, email, password FROM users WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| Error::internal("database error").with_source(err))?
            .ok_or_else(|| Error::not_found("user"))?;

        Ok(User {
            id: row.try_get("id").map_err(decode_error)?,
            username: row.try_get("username").map_err(decode_error)?,
            email: row.try_get("email").map_err(decode_error)?,
            password_hash: row.try_get("password").map_err(decode_error)?,
        })
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .map_err(|err| Error::internal("database unavailable").with_source(err))?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .map_err(|err| Error::internal("database unavailable").with_source(err))
    }
}

fn decode_error(err: sqlx::Error) -> Error {
    Error::internal("database error").with_source(err)
}

/// SQLSTATE 23505 is `unique_violation`; the only unique column is `email`.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
