use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use claims::Claims;
pub use jwt::{JwtKeys, SigningError, TokenIssuer, ValidationError};
pub use password::{Argon2Hasher, HashingError, PasswordHasher};
pub use repo::{DirectoryError, InMemoryUserDirectory, PgUserDirectory, UserDirectory};
pub use repo_types::User;
pub use services::{AuthService, LoginError, RegistrationError};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
