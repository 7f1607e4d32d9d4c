use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the directory.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,                     // assigned once, never reused
    pub name: String,                 // display name
    pub email: String,                // unique, case-sensitive as stored
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2id PHC string, never exposed
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}
