//! Reject callers whose session carries no authenticated identity.

use super::{Session, USER_ID_KEY};
use crate::{Error, Result};
use axum::{extract::Request, middleware::Next, response::Response, Extension};

/// Identity attached to requests that passed [`require_session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Allow the request through only when the session holds a non-empty `user_id`.
///
/// # Errors
/// Returns `Unauthorized` for anonymous sessions.
pub async fn require_session(
    Extension(session): Extension<Session>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user_id = session
        .get_string(USER_ID_KEY)
        .await
        .filter(|user_id| !user_id.is_empty())
        .ok_or_else(|| Error::unauthorized("unauthorized"))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
