use std::sync::Arc;

use sqlx::{migrate::Migrator, PgPool};

use crate::{
    auth::{
        Argon2Hasher, AuthService, InMemoryUserDirectory, JwtKeys, PasswordHasher,
        PgUserDirectory, TokenIssuer, UserDirectory,
    },
    clock::{Clock, SystemClock},
    config::AppConfig,
};

/// Schema migrations, embedded at build time. Startup refuses to serve if
/// they fail to apply.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Production wiring over Postgres.
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let directory = Arc::new(PgUserDirectory::new(db)) as Arc<dyn UserDirectory>;
        Self::with_directory(config, directory, Arc::new(SystemClock))
    }

    /// Same wiring over a process-local directory.
    pub fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let directory = Arc::new(InMemoryUserDirectory::new()) as Arc<dyn UserDirectory>;
        Self::with_directory(config, directory, clock)
    }

    pub fn with_directory(
        config: AppConfig,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new(config.hash)?) as Arc<dyn PasswordHasher>;
        let tokens = Arc::new(JwtKeys::new(&config.jwt, clock.clone())?) as Arc<dyn TokenIssuer>;
        let auth = AuthService::new(directory, hasher, tokens, clock, config.auth)?;
        Ok(Self::from_parts(Arc::new(config), Arc::new(auth)))
    }

    pub fn from_parts(config: Arc<AppConfig>, auth: Arc<AuthService>) -> Self {
        Self { config, auth }
    }
}
