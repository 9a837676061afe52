use crate::{error::ErrorBody, session::AuthenticatedUser};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProtectedResponse {
    pub message: String,
    pub user_id: String,
}

#[utoipa::path(
    get,
    path = "/protected",
    responses(
        (status = 200, description = "Caller is authenticated", body = ProtectedResponse),
        (status = 401, description = "No authenticated session", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn protected(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    Json(ProtectedResponse {
        message: "protected route accessed".to_string(),
        user_id: user.user_id,
    })
}
