//! Credential hashing, payload validation and the authentication service.

pub mod password;
pub mod service;
pub mod validation;

pub use password::{CredentialError, CredentialHasher, PasswordConfig};
pub use service::{AuthService, SigninRequest, SignupRequest};
