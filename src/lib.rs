//! Credential lifecycle service: registration, login, Argon2id password
//! hashing and stateless JWT bearer tokens, with a thin axum boundary.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod retry;
pub mod state;

pub use app::build_app;
pub use config::{AppConfig, AuthConfig, ConfigError, HashConfig, JwtConfig};
pub use state::AppState;
