use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload binding a user's identity to a validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,      // user ID, string form
    pub user_id: Uuid,    // user ID
    pub email: String,    // email at issue time
    pub iss: String,      // issuer
    pub iat: i64,         // issued at (unix timestamp)
    pub nbf: i64,         // not before (unix timestamp)
    pub exp: i64,         // expires at (unix timestamp)
}
