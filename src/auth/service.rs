//! Signup and signin orchestration.
//!
//! Flow Overview:
//! - signup: validate shape, hash the password off the async runtime, insert.
//! - signin: validate shape, look up by email, verify, return the user id.
//!
//! Session side effects (renew, then write `user_id`) belong to the caller.

use super::{
    password::CredentialHasher,
    validation::{normalize_email, validate_signin, validate_signup},
};
use crate::{
    store::{NewUser, User, UserStore},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

// Keep plaintext passwords out of logs and spans.
impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Debug for SigninRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: CredentialHasher) -> Self {
        Self { users, hasher }
    }

    /// Register a new account.
    ///
    /// # Errors
    /// `BadRequest` on invalid input, `Conflict` if the email is taken,
    /// `Internal` for hashing or storage failures.
    #[instrument(skip(self))]
    pub async fn signup(&self, request: SignupRequest) -> Result<User> {
        validate_signup(&request)?;

        let SignupRequest {
            username,
            email,
            password,
        } = request;

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::internal("error hashing password").with_source(err))?
            .map_err(|err| Error::internal("error hashing password").with_source(err))?;

        let user = self
            .users
            .create(NewUser {
                username: username.trim().to_string(),
                email: normalize_email(&email),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user created");

        Ok(user)
    }

    /// Check credentials and return the user's id.
    ///
    /// # Errors
    /// `BadRequest` on invalid input, `NotFound` for an unknown email,
    /// `Unauthorized` when the password does not match, `Internal` otherwise.
    #[instrument(skip(self))]
    pub async fn signin(&self, request: SigninRequest) -> Result<Uuid> {
        validate_signin(&request)?;

        let user = self
            .users
            .find_by_email(&normalize_email(&request.email))
            .await?;

        let hasher = self.hasher.clone();
        let password = request.password;
        let digest = user.password_hash;
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|err| Error::internal("error verifying password").with_source(err))?;

        if !matches {
            debug!(user_id = %user.id, "password mismatch");
            return Err(Error::unauthorized("invalid credentials"));
        }

        Ok(user.id)
    }

    /// # Errors
    /// Returns an error if the user store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.users.ping().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{auth::password::PasswordConfig, store::MemoryUserStore, ErrorKind};
    use proptest::prelude::*;

    fn service() -> (AuthService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let hasher = CredentialHasher::new(&PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap();
        (AuthService::new(store.clone(), hasher), store)
    }

    fn signup_request(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn signin_request(email: &str, password: &str) -> SigninRequest {
        SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn signup_stores_hash_not_plaintext() {
        let (service, store) = service();
        let user = service
            .signup(signup_request(" alice ", "Alice@Example.com", "secret1"))
            .await
            .unwrap();

        let stored = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(stored.id, user.id);
        assert_eq!(stored.username, "alice");
        assert_ne!(stored.password_hash, "secret1");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn signup_duplicate_email_conflicts() {
        let (service, _) = service();
        service
            .signup(signup_request("alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let err = service
            .signup(signup_request("alice2", "alice@example.com", "another-secret"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.message(), "user already exists");
    }

    #[tokio::test]
    async fn signup_rejects_invalid_shape_before_touching_the_store() {
        let (service, store) = service();
        let err = service
            .signup(signup_request("al", "alice@example.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn signin_returns_the_signup_id() {
        let (service, _) = service();
        let user = service
            .signup(signup_request("alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let id = service
            .signin(signin_request("ALICE@example.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(id, user.id);
    }

    #[tokio::test]
    async fn signin_wrong_password_is_unauthorized() {
        let (service, _) = service();
        service
            .signup(signup_request("alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let err = service
            .signin(signin_request("alice@example.com", "secret2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.message(), "invalid credentials");
    }

    #[tokio::test]
    async fn signin_unknown_email_is_not_found() {
        let (service, _) = service();
        let err = service
            .signin(signin_request("ghost@example.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn signin_rejects_long_passwords_accepted_by_signup() {
        let (service, _) = service();
        let long = "p".repeat(30);
        service
            .signup(signup_request("alice", "alice@example.com", &long))
            .await
            .unwrap();

        let err = service
            .signin(signin_request("alice@example.com", &long))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn debug_output_masks_passwords() {
        let request = signup_request("alice", "alice@example.com", "secret1");
        let output = format!("{request:?}");
        assert!(!output.contains("secret1"));
        assert!(output.contains("***"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn duplicate_email_conflicts_for_any_credentials(
            local in "[a-z][a-z0-9]{0,15}",
            first in ("[a-z]{3,20}", "[A-Za-z0-9]{6,40}"),
            second in ("[a-z]{3,20}", "[A-Za-z0-9]{6,40}"),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (service, store) = service();
            let email = format!("{local}@example.com");

            runtime.block_on(async {
                service
                    .signup(signup_request(&first.0, &email, &first.1))
                    .await
                    .unwrap();

                let err = service
                    .signup(signup_request(&second.0, &email.to_uppercase(), &second.1))
                    .await
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Conflict);
                assert_eq!(store.len().await, 1);
            });
        }
    }
}
