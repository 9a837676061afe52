pub mod auth;
pub mod health;
pub mod protected;

use crate::Error;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Malformed JSON is a bad request; well-formed JSON of the wrong shape is unprocessable.
pub(crate) fn json_rejection(rejection: JsonRejection) -> Error {
    debug!("rejected request body: {rejection}");
    match rejection {
        JsonRejection::JsonDataError(err) => Error::unprocessable(err.body_text()),
        _ => Error::bad_request("invalid request"),
    }
}
