//! Load the session before a handler runs and persist it afterwards.

use super::{
    now_unix_seconds, store_key, Session, SessionConfig, SessionRecord, SessionStore,
    SESSION_COOKIE_NAME,
};
use crate::{Error, Result};
use axum::{
    extract::{Request, State},
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// # Errors
    /// Returns an error if the session store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Resolve the request cookie into a session.
    ///
    /// Missing, unknown and expired tokens all yield a fresh anonymous session.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn load(&self, headers: &HeaderMap) -> Result<Session> {
        let lifetime = self.config.lifetime();
        let Some(token) = extract_session_token(headers) else {
            return Ok(Session::anonymous(lifetime));
        };

        match self.store.load(&store_key(&token)).await? {
            Some(record) if !record.is_expired(now_unix_seconds()) => {
                Ok(Session::existing(token, record, lifetime))
            }
            Some(_) => {
                debug!("session expired");
                Ok(Session::anonymous(lifetime))
            }
            None => Ok(Session::anonymous(lifetime)),
        }
    }

    /// Persist pending changes and return the cookie to send, if any.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn commit(&self, session: &Session) -> Result<Option<HeaderValue>> {
        let Some(commit) = session.take_commit().await? else {
            return Ok(None);
        };

        let Some(ttl) = commit.record.remaining(now_unix_seconds()) else {
            warn!("session expired before it could be saved");
            return Ok(None);
        };

        // Old tokens must stop resolving before the renewed record exists.
        for token in &commit.discarded {
            self.discard(token).await?;
        }

        self.store
            .save(&store_key(&commit.token), &commit.record, ttl)
            .await?;

        session_cookie(&self.config, &commit.token, ttl.as_secs())
            .map(Some)
            .map_err(|err| Error::internal("failed to build session cookie").with_source(err))
    }

    /// Remove the record behind a replaced token, or overwrite it with an
    /// already expired one when the delete fails.
    async fn discard(&self, token: &str) -> Result<()> {
        let key = store_key(token);
        let Err(err) = self.store.delete(&key).await else {
            return Ok(());
        };
        warn!("failed to delete replaced session, expiring it instead: {}", err);

        let expired = SessionRecord {
            expires_at: now_unix_seconds(),
            ..SessionRecord::default()
        };
        self.store
            .save(&key, &expired, Duration::from_secs(1))
            .await
    }
}

/// Middleware that exposes a [`Session`] to handlers through request extensions.
pub async fn load_and_save(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match manager.load(request.headers()).await {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    match manager.commit(&session).await {
        Ok(Some(cookie)) => {
            response.headers_mut().append(SET_COOKIE, cookie);
            response
        }
        Ok(None) => response,
        Err(err) => err.into_response(),
    }
}

/// Build an `HttpOnly` cookie for the session token.
fn session_cookie(
    config: &SessionConfig,
    token: &str,
    max_age: u64,
) -> std::result::Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
