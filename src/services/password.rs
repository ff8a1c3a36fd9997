//! Password hashing.

use crate::{Error, Result};
use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

/// Hashes and verifies passwords with Argon2id.
///
/// Hashes are PHC strings (`$argon2id$v=19$...`) with a fresh 16-byte salt
/// per call, so hashing the same password twice yields different strings.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Creates a hasher with the default Argon2id parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if Argon2 rejects the parameters
    /// (memory below 8 KiB or zero iterations).
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| Error::InvalidInput(format!("invalid password hash cost: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if salt encoding or hashing fails.
    pub fn hash(&self, password: &SecretString) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| Error::operation("encode_salt", e))?;

        self.argon2
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::operation("hash_password", e))
    }

    /// Returns whether `password` matches the PHC string `hash`.
    ///
    /// A malformed hash never matches.
    #[must_use]
    pub fn verify(&self, password: &SecretString, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            self.argon2
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::with_cost(8, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let password = SecretString::from("correct horse battery");
        let hash = hasher.hash(&password).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&password, &hash));
        assert!(!hasher.verify(&SecretString::from("wrong"), &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = cheap();
        let password = SecretString::from("password123");
        let first = hasher.hash(&password).unwrap();
        let second = hasher.hash(&password).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let hasher = cheap();
        assert!(!hasher.verify(&SecretString::from("password123"), "not-a-hash"));
    }

    #[test]
    fn test_with_cost_rejects_invalid_params() {
        assert!(matches!(
            PasswordHasher::with_cost(1, 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(PasswordHasher::with_cost(8, 0).is_err());
    }
}
