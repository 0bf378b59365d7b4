//! One-way hashing of owner passwords with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
//! so the random per-call salt and the cost parameters travel with the
//! hash.  Verification always uses the parameters embedded in the hash,
//! which lets the configured cost change without invalidating old
//! accounts.

use aes_gcm::aead::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::{VaultError, Result};

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id cost parameters.
///
/// These map 1:1 to the fields in `Settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherParams {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HasherParams {
    /// The cheapest parameters `CredentialHasher::new` accepts.
    pub fn minimum() -> Self {
        Self {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Salted, slow, one-way hashing of owner passwords.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Build a hasher, rejecting dangerously weak parameters.
    pub fn new(hasher_params: HasherParams) -> Result<Self> {
        if hasher_params.memory_kib < MIN_MEMORY_KIB {
            return Err(VaultError::HashingFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                hasher_params.memory_kib
            )));
        }
        if hasher_params.iterations < 1 {
            return Err(VaultError::HashingFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if hasher_params.parallelism < 1 {
            return Err(VaultError::HashingFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }

        let params = Params::new(
            hasher_params.memory_kib,
            hasher_params.iterations,
            hasher_params.parallelism,
            None,
        )
        .map_err(|e| VaultError::HashingFailed(format!("invalid Argon2 params: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| VaultError::HashingFailed(format!("Argon2id hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Check `secret` against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on a mismatch; only a malformed hash is an error.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| VaultError::HashingFailed(format!("stored hash is malformed: {e}")))?;

        match self.argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(VaultError::HashingFailed(format!(
                "Argon2id verification failed: {e}"
            ))),
        }
    }
}
