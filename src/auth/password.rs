use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

use crate::config::{ConfigError, HashConfig};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashingError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("malformed password hash: {0}")]
    Malformed(String),
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("argon2 failure: {0}")]
    Backend(String),
}

/// One-way password hashing with self-describing output.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashingError>;

    /// `Ok(false)` on mismatch; `Err` only when `encoded` cannot be used.
    fn verify(&self, password: &str, encoded: &str) -> Result<bool, HashingError>;
}

/// Argon2id with fresh random salt per hash. Output is a PHC string
/// (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`), so hashes made with older
/// parameters keep verifying after the configured cost changes.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(cfg: HashConfig) -> Result<Self, ConfigError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| ConfigError::HashParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashingError> {
        if password.is_empty() {
            return Err(HashingError::EmptyPassword);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashingError::Backend(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, password: &str, encoded: &str) -> Result<bool, HashingError> {
        let parsed = PasswordHash::new(encoded).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            HashingError::Malformed(e.to_string())
        })?;
        if Algorithm::try_from(parsed.algorithm).is_err() {
            return Err(HashingError::UnsupportedAlgorithm(
                parsed.algorithm.to_string(),
            ));
        }
        // Digest comparison inside argon2 is constant-time.
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(HashingError::Malformed(e.to_string()))
            }
        }
    }
}
