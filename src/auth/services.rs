use std::{
    sync::{Arc, OnceLock},
    time::Instant,
};

use thiserror::Error;
use tokio::task;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Claims,
        dto::{LoginRequest, RegistrationRequest},
        jwt::{TokenIssuer, ValidationError},
        password::{HashingError, PasswordHasher},
        repo::{DirectoryError, UserDirectory},
        repo_types::User,
    },
    clock::Clock,
    config::{AuthConfig, ConfigError},
    retry::{linear_backoff, with_retry},
};

const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("email already registered")]
    EmailTaken,
    #[error("password hashing failed: {0}")]
    HashingFailed(#[source] HashingError),
    #[error("user directory unavailable: {0}")]
    StorageUnavailable(#[source] DirectoryError),
    #[error("registration timed out")]
    Timeout,
}

/// `InvalidCredentials` is deliberately the same for unknown email and wrong
/// password.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("login timed out")]
    Timeout,
}

/// Registration and login over pluggable directory, hasher and token issuer.
///
/// Holds no per-call state; every call is bounded by `AuthConfig::timeout`.
/// On timeout the service stops waiting, but a directory write already in
/// flight may still land.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    decoy_hash: Arc<OnceLock<Option<String>>>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            directory,
            hasher,
            tokens,
            clock,
            config,
            decoy_hash: Arc::new(OnceLock::new()),
        })
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegistrationRequest) -> Result<User, RegistrationError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, self.register_inner(req))
            .await
            .unwrap_or_else(|_| {
                warn!(timeout_ms = self.config.timeout.as_millis() as u64, "registration timed out");
                Err(RegistrationError::Timeout)
            });
        match &result {
            Ok(user) => info!(
                user_id = %user.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "user registered"
            ),
            Err(e) => warn!(error = %e, "registration failed"),
        }
        result
    }

    async fn register_inner(&self, req: RegistrationRequest) -> Result<User, RegistrationError> {
        // Advisory only; the directory's unique constraint decides races.
        match self.directory.find_by_email(&req.email).await {
            Ok(_) => return Err(RegistrationError::EmailTaken),
            Err(DirectoryError::NotFound) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(RegistrationError::StorageUnavailable(e));
            }
        }

        let hash = self
            .hash_blocking(req.password)
            .await
            .map_err(RegistrationError::HashingFailed)?;

        let user = User::new(req.name, req.email, hash, self.clock.now());

        let directory = &self.directory;
        let candidate = &user;
        with_retry(
            self.config.create_attempts,
            linear_backoff(self.config.backoff_unit),
            DirectoryError::is_transient,
            |attempt| async move {
                let started = Instant::now();
                let res = directory.create(candidate).await;
                debug!(
                    attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = res.is_ok(),
                    "directory create"
                );
                res
            },
        )
        .await
        .map_err(|e| match e {
            DirectoryError::DuplicateKey => RegistrationError::EmailTaken,
            other => {
                error!(error = %other, "create user failed");
                RegistrationError::StorageUnavailable(other)
            }
        })?;

        Ok(user)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<(String, User), LoginError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, self.login_inner(req))
            .await
            .unwrap_or_else(|_| {
                warn!(timeout_ms = self.config.timeout.as_millis() as u64, "login timed out");
                Err(LoginError::Timeout)
            });
        if let Ok((_, user)) = &result {
            info!(
                user_id = %user.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "user logged in"
            );
        }
        result
    }

    async fn login_inner(&self, req: LoginRequest) -> Result<(String, User), LoginError> {
        let user = match self.directory.find_by_email(&req.email).await {
            Ok(user) => user,
            Err(e) => {
                match e {
                    DirectoryError::NotFound => warn!("login unknown email"),
                    other => error!(error = %other, "find_by_email failed"),
                }
                self.decoy_verify(req.password).await;
                return Err(LoginError::InvalidCredentials);
            }
        };

        let matched = self
            .verify_blocking(req.password, user.password_hash.clone())
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "verify_password failed");
                LoginError::InternalError(e.to_string())
            })?;
        if !matched {
            warn!(user_id = %user.id, "login invalid password");
            return Err(LoginError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email).map_err(|e| {
            error!(error = %e, user_id = %user.id, "jwt sign failed");
            LoginError::InternalError(e.to_string())
        })?;

        Ok((token, user))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ValidationError> {
        self.tokens.validate(token)
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        self.directory.find_by_id(id).await
    }

    async fn hash_blocking(&self, password: String) -> Result<String, HashingError> {
        let hasher = Arc::clone(&self.hasher);
        task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HashingError::Backend(e.to_string()))?
    }

    async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, HashingError> {
        let hasher = Arc::clone(&self.hasher);
        task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| HashingError::Backend(e.to_string()))?
    }

    /// Spends one verification on unknown accounts so they cost about as much
    /// as a wrong password.
    async fn decoy_verify(&self, password: String) {
        let hasher = Arc::clone(&self.hasher);
        let decoy = Arc::clone(&self.decoy_hash);
        let _ = task::spawn_blocking(move || {
            if let Some(hash) = decoy.get_or_init(|| hasher.hash(DECOY_PASSWORD).ok()) {
                let _ = hasher.verify(&password, hash);
            }
        })
        .await;
    }
}
