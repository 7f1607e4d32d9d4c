use std::sync::Arc;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::claims::Claims,
    clock::Clock,
    config::{ConfigError, JwtConfig},
};

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct SigningError(String);

impl SigningError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed or forged token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidAlgorithm => ValidationError::AlgorithmMismatch,
            ErrorKind::ExpiredSignature => ValidationError::Expired,
            ErrorKind::ImmatureSignature => ValidationError::NotYetValid,
            _ => ValidationError::Malformed,
        }
    }
}

/// Issues and checks stateless bearer tokens.
///
/// Nothing is recorded per token, so an issued token stays valid until it
/// expires; there is no revocation.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid, email: &str) -> Result<String, SigningError>;
    fn validate(&self, token: &str) -> Result<Claims, ValidationError>;
}

/// HS256 signer/verifier over a shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if cfg.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if cfg.ttl_minutes <= 0 {
            return Err(ConfigError::NonPositiveTtl(cfg.ttl_minutes));
        }
        let ttl = cfg
            .ttl_minutes
            .checked_mul(60)
            .map(Duration::seconds)
            .filter(|ttl| clock.now().checked_add(*ttl).is_some())
            .ok_or(ConfigError::TtlOutOfRange(cfg.ttl_minutes))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl,
            clock,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
        // Temporal checks run against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation
    }
}

impl TokenIssuer for JwtKeys {
    fn issue(&self, user_id: Uuid, email: &str) -> Result<String, SigningError> {
        let now = self.clock.now();
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| SigningError::new("token expiry out of range"))?;
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now.unix_timestamp(),
            nbf: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| SigningError::new(e.to_string()))?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            ValidationError::from(e)
        })?;
        let claims = data.claims;

        let now = self.clock.now().unix_timestamp();
        if claims.nbf > now {
            return Err(ValidationError::NotYetValid);
        }
        if now > claims.exp {
            return Err(ValidationError::Expired);
        }
        if claims.sub != claims.user_id.to_string() {
            return Err(ValidationError::Malformed);
        }

        debug!(user_id = %claims.user_id, "jwt verified");
        Ok(claims)
    }
}
