//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! the salt and parameters travel with the digest and verification needs no
//! extra state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("failed to hash password: {0}")]
    HashingFailed(String),
}

/// Argon2 cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Iterations (default: 3)
    pub time_cost: u32,
    /// Lanes (default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    fn to_params(&self) -> Result<Params, CredentialError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))
    }
}

/// One-way hash + verify for passwords.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// # Errors
    /// Returns an error if the configured cost parameters are rejected by Argon2.
    pub fn new(config: &PasswordConfig) -> Result<Self, CredentialError> {
        Ok(Self {
            params: config.to_params()?,
        })
    }

    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    /// Only fails on an internal Argon2 error, never because of the input.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CredentialError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC string.
    ///
    /// Any mismatch, including a malformed digest, is reported as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };

        // Parameters come from the digest itself.
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap()
    }

    #[test]
    fn hash_and_verify_password() {
        let hasher = hasher();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hasher.verify("secret1", &hash));
        assert!(!hasher.verify("secret2", &hash));
    }

    #[test]
    fn hash_never_equals_plaintext() {
        let hash = hasher().hash("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn same_password_produces_different_hashes() {
        let hasher = hasher();
        let first = hasher.hash("SamePassword123!").unwrap();
        let second = hasher.hash("SamePassword123!").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("SamePassword123!", &first));
        assert!(hasher.verify("SamePassword123!", &second));
    }

    #[test]
    fn malformed_digest_does_not_verify() {
        let hasher = hasher();
        assert!(!hasher.verify("password", "invalid-hash-format"));
        assert!(!hasher.verify("password", ""));
    }

    #[test]
    fn empty_password_still_hashes() {
        let hasher = hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash));
        assert!(!hasher.verify(" ", &hash));
    }

    #[test]
    fn custom_config_is_embedded_in_hash() {
        let hash = CredentialHasher::new(&PasswordConfig {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap()
        .hash("TestPassword123!")
        .unwrap();

        assert!(hash.contains("m=2048"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = CredentialHasher::new(&PasswordConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
            output_len: Some(32),
        });
        assert!(matches!(result, Err(CredentialError::InvalidParams(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn verify_accepts_only_the_hashed_password(
            password in ".{0,40}",
            other in ".{0,40}",
        ) {
            prop_assume!(password != other);
            let hasher = hasher();
            let hash = hasher.hash(&password).unwrap();

            prop_assert!(hasher.verify(&password, &hash));
            prop_assert!(!hasher.verify(&other, &hash));
        }
    }
}
