//! Signup, signin and logout endpoints.
//!
//! Flow Overview: signin and logout both renew the session before touching
//! `user_id`, so the token a client held before the change stops working.

use super::{json_rejection, MessageResponse};
use crate::{
    auth::{AuthService, SigninRequest, SignupRequest},
    error::ErrorBody,
    session::{Session, USER_ID_KEY},
    Result,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Malformed body or invalid fields", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Body does not match the expected shape", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signup(
    auth: Extension<Arc<AuthService>>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(json_rejection)?;

    auth.signup(request).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::new("user created"))))
}

#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = MessageResponse),
        (status = 400, description = "Malformed body or invalid fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 404, description = "Unknown email", body = ErrorBody),
        (status = 422, description = "Body does not match the expected shape", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signin(
    auth: Extension<Arc<AuthService>>,
    Extension(session): Extension<Session>,
    payload: std::result::Result<Json<SigninRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(json_rejection)?;

    let user_id = auth.signin(request).await?;

    session.renew().await?;
    session.insert(USER_ID_KEY, user_id.to_string()).await?;

    info!(%user_id, "signed in");

    Ok(Json(MessageResponse::new("signed in")))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cleared and renewed", body = MessageResponse),
        (status = 401, description = "No authenticated session", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(Extension(session): Extension<Session>) -> Result<impl IntoResponse> {
    session.renew().await?;
    session.remove(USER_ID_KEY).await;

    Ok(Json(MessageResponse::new("logged out")))
}
