use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateKey,
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Storage(_))
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DirectoryError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DirectoryError::DuplicateKey
            }
            other => DirectoryError::Storage(other.into()),
        }
    }
}

/// Durable user store keyed by unique email.
///
/// `create` must be atomic against the unique-email constraint and report a
/// violation as `DuplicateKey`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), DirectoryError>;
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError>;
}

/// Postgres-backed directory. The `users.email` unique index is the
/// authoritative uniqueness check.
#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: &User) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(DirectoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(DirectoryError::NotFound)
    }
}

/// Process-local directory for tests and local runs.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> DirectoryError {
    DirectoryError::Storage(anyhow::anyhow!("in-memory directory lock poisoned"))
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, user: &User) -> Result<(), DirectoryError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&user.email) || users.values().any(|u| u.id == user.id) {
            return Err(DirectoryError::DuplicateKey);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let users = self.users.read().map_err(poisoned)?;
        users.get(email).cloned().ok_or(DirectoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        let users = self.users.read().map_err(poisoned)?;
        users
            .values()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}
