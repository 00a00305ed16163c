//! Refresh-token session model and DTO.

use sqlx::FromRow;

use canopy_core::types::{DbId, Timestamp};

/// Full session row from the `sessions` table.
///
/// Only the SHA-256 hash of the refresh token is stored; the plaintext never
/// touches the database.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new session.
#[derive(Debug)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
