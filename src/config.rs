use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Raised when a component is built from values it cannot work with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,
    #[error("token lifetime must be positive, got {0} minutes")]
    NonPositiveTtl(i64),
    #[error("token lifetime of {0} minutes is out of range")]
    TtlOutOfRange(i64),
    #[error("missing environment variable {0}")]
    MissingEnv(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
    #[error("invalid argon2 parameters: {0}")]
    HashParams(String),
    #[error("auth timeout must be positive")]
    ZeroTimeout,
    #[error("at least one create attempt is required")]
    ZeroAttempts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimums)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Per-call policy for `AuthService`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AuthConfig {
    pub timeout: Duration,
    pub create_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            create_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.create_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Builds the config from a key lookup. Absent keys take their default;
    /// present but unparsable values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnv(key.into()));
        let parsed = |key: &str, default| parse_or(&lookup, key, default);

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "credgate".into()),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60)?,
        };

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parsed("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parsed("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parsed("ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let auth = AuthConfig {
            timeout: Duration::from_secs(parse_or(&lookup, "AUTH_TIMEOUT_SECS", 60)?),
            create_attempts: parsed("AUTH_CREATE_ATTEMPTS", 3)?,
            backoff_unit: Duration::from_millis(parse_or(&lookup, "AUTH_BACKOFF_MS", 1000)?),
        };
        auth.validate()?;

        Ok(Self {
            database_url,
            jwt,
            hash,
            auth,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
            key: key.into(),
            value,
        }),
    }
}
