use super::handlers::{self, auth, health, protected};
use crate::{
    auth::{SigninRequest, SignupRequest},
    error::{ErrorBody, ErrorKind},
};
use utoipa::OpenApi;

/// Document for every route served by [`super::router`]; info is taken from Cargo metadata.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::signup,
        auth::signin,
        auth::logout,
        protected::protected
    ),
    components(schemas(
        SignupRequest,
        SigninRequest,
        handlers::MessageResponse,
        protected::ProtectedResponse,
        health::Health,
        ErrorBody,
        ErrorKind
    )),
    tags(
        (name = "auth", description = "Signup, signin and session-gated routes"),
        (name = "health", description = "Service and dependency status")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
