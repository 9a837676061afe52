//! Server-side sessions keyed by an opaque cookie token.
//!
//! Flow Overview:
//! - [`layer::load_and_save`] resolves the cookie into a [`Session`] before the
//!   handler runs and commits it afterwards.
//! - Handlers read and write typed values through the [`Session`] handle and
//!   call [`Session::renew`] whenever the authentication state changes.
//! - [`gate::require_session`] turns away sessions without a `user_id`.
//!
//! Security boundaries: the raw token only lives in the cookie. Stores are
//! keyed by a SHA-256 hash of it, and every renew deletes the previous record
//! so a token fixed before login never becomes authenticated.

pub mod gate;
pub mod layer;
mod memory;
mod redis;

pub use gate::{require_session, AuthenticatedUser};
pub use layer::{load_and_save, SessionManager};
pub use memory::MemorySessionStore;
pub use redis::{RedisPoolSettings, RedisSessionStore};

use crate::{Error, Result};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::Mutex;

pub const SESSION_COOKIE_NAME: &str = "accountd_session";

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const STORE_KEY_PREFIX: &str = "session:";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    lifetime: Duration,
    cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_SESSION_LIFETIME,
            cookie_secure: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// What the store keeps for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub data: HashMap<String, Value>,
    /// Absolute expiry, seconds since the Unix epoch.
    pub expires_at: i64,
}

impl SessionRecord {
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, `None` once expired.
    #[must_use]
    pub fn remaining(&self, now: i64) -> Option<Duration> {
        let left = self.expires_at.checked_sub(now)?;
        u64::try_from(left)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Keyed session persistence with expiry.
///
/// Keys passed in are already hashed; implementations never see raw tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns an error if the store cannot be reached or the record is corrupt.
    async fn load(&self, key: &str) -> Result<Option<SessionRecord>>;

    /// Insert or replace a record that expires after `ttl`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn save(&self, key: &str, record: &SessionRecord, ttl: Duration) -> Result<()>;

    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn delete(&self, key: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn ping(&self) -> Result<()>;
}

/// Create a new random session token for the cookie.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::internal("failed to generate session token").with_source(err))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Store key for a token; only the hash of the token is ever persisted.
#[must_use]
pub fn store_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{STORE_KEY_PREFIX}{}", Base64UrlUnpadded::encode_string(&digest))
}

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn expires_at(lifetime: Duration) -> i64 {
    now_unix_seconds().saturating_add(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX))
}

#[derive(Debug)]
struct SessionState {
    token: Option<String>,
    record: SessionRecord,
    lifetime: Duration,
    modified: bool,
    discarded: Vec<String>,
}

/// Pending writes for one session, produced once the handler has finished.
#[derive(Debug)]
pub(crate) struct Commit {
    pub(crate) token: String,
    pub(crate) record: SessionRecord,
    pub(crate) discarded: Vec<String>,
}

/// Per-request handle to the caller's session.
///
/// Cloning is cheap; all clones share the same state for the request.
#[derive(Clone, Debug)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    /// A fresh, anonymous session. Nothing is persisted until it is modified.
    #[must_use]
    pub fn anonymous(lifetime: Duration) -> Self {
        Self::from_state(SessionState {
            token: None,
            record: SessionRecord {
                data: HashMap::new(),
                expires_at: expires_at(lifetime),
            },
            lifetime,
            modified: false,
            discarded: Vec::new(),
        })
    }

    pub(crate) fn existing(token: String, record: SessionRecord, lifetime: Duration) -> Self {
        Self::from_state(SessionState {
            token: Some(token),
            record,
            lifetime,
            modified: false,
            discarded: Vec::new(),
        })
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Read a typed value; `None` when missing or of another shape.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.lock().await;
        let value = state.record.data.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    pub async fn get_string(&self, key: &str) -> Option<String> {
        self.get::<String>(key).await
    }

    /// Store a typed value.
    ///
    /// # Errors
    /// Returns an error if the value cannot be serialized to JSON.
    pub async fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|err| Error::internal("failed to encode session value").with_source(err))?;
        let mut state = self.state.lock().await;
        state.record.data.insert(key.to_string(), value);
        state.modified = true;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock().await;
        let removed = state.record.data.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    /// Issue a new token and restart the lifetime, keeping the data.
    ///
    /// The previous token's record is deleted when the session is committed.
    ///
    /// # Errors
    /// Returns an error if a new token cannot be generated.
    pub async fn renew(&self) -> Result<()> {
        let token = generate_session_token()?;
        let mut state = self.state.lock().await;
        if let Some(previous) = state.token.replace(token) {
            state.discarded.push(previous);
        }
        state.record.expires_at = expires_at(state.lifetime);
        state.modified = true;
        Ok(())
    }

    /// Current token, `None` for a session that was never persisted.
    pub async fn token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    pub async fn is_modified(&self) -> bool {
        self.state.lock().await.modified
    }

    /// Drain pending changes. Returns `None` when nothing needs writing.
    pub(crate) async fn take_commit(&self) -> Result<Option<Commit>> {
        let mut state = self.state.lock().await;
        if !state.modified {
            return Ok(None);
        }

        let token = match &state.token {
            Some(token) => token.clone(),
            None => {
                let token = generate_session_token()?;
                state.token = Some(token.clone());
                token
            }
        };

        state.modified = false;
        Ok(Some(Commit {
            token,
            record: state.record.clone(),
            discarded: std::mem::take(&mut state.discarded),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generate_session_token_has_32_random_bytes() {
        let token = generate_session_token().unwrap();
        let decoded = Base64UrlUnpadded::decode_vec(&token).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_ne!(token, generate_session_token().unwrap());
    }

    #[test]
    fn store_key_is_stable_and_hides_the_token() {
        let first = store_key("token");
        assert_eq!(first, store_key("token"));
        assert_ne!(first, store_key("other"));
        assert!(first.starts_with("session:"));
        assert!(!first.contains("token"));
    }

    #[test]
    fn record_expiry() {
        let record = SessionRecord {
            data: HashMap::new(),
            expires_at: 100,
        };
        assert!(!record.is_expired(99));
        assert!(record.is_expired(100));
        assert_eq!(record.remaining(40), Some(Duration::from_secs(60)));
        assert_eq!(record.remaining(100), None);
        assert_eq!(record.remaining(200), None);
    }

    #[tokio::test]
    async fn anonymous_session_commits_nothing_until_modified() {
        let session = Session::anonymous(DEFAULT_SESSION_LIFETIME);
        assert!(session.token().await.is_none());
        assert!(session.take_commit().await.unwrap().is_none());

        session.insert("theme", "dark").await.unwrap();
        let commit = session.take_commit().await.unwrap().unwrap();
        assert_eq!(session.token().await, Some(commit.token.clone()));
        assert!(commit.discarded.is_empty());
        assert!(!session.is_modified().await);
    }

    #[tokio::test]
    async fn typed_values_round_trip_through_json() {
        let session = Session::anonymous(DEFAULT_SESSION_LIFETIME);
        session.insert(USER_ID_KEY, "abc").await.unwrap();
        session.insert("count", 3_u32).await.unwrap();

        assert_eq!(session.get_string(USER_ID_KEY).await, Some("abc".into()));
        assert_eq!(session.get::<u32>("count").await, Some(3));
        // Wrong shape reads as missing.
        assert_eq!(session.get::<u32>(USER_ID_KEY).await, None);
    }

    #[tokio::test]
    async fn removing_a_missing_key_is_not_a_change() {
        let session = Session::anonymous(DEFAULT_SESSION_LIFETIME);
        assert!(session.remove(USER_ID_KEY).await.is_none());
        assert!(!session.is_modified().await);
    }

    #[tokio::test]
    async fn renew_discards_the_previous_token_and_keeps_data() {
        let mut data = HashMap::new();
        data.insert("theme".to_string(), Value::from("dark"));
        let session = Session::existing(
            "old-token".to_string(),
            SessionRecord {
                data,
                expires_at: now_unix_seconds() + 10,
            },
            DEFAULT_SESSION_LIFETIME,
        );

        session.renew().await.unwrap();
        let commit = session.take_commit().await.unwrap().unwrap();

        assert_ne!(commit.token, "old-token");
        assert_eq!(commit.discarded, vec!["old-token".to_string()]);
        assert_eq!(commit.record.data.get("theme"), Some(&Value::from("dark")));
        // Lifetime restarts on renew.
        assert!(commit.record.expires_at > now_unix_seconds() + 60);
    }
}
