//! Tree image entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use canopy_core::types::{DbId, Timestamp};

/// Valid classification strings (stored in DB).
pub const VALID_CLASSIFICATIONS: &[&str] =
    &["full_tree", "bark", "leaf", "fruit", "disease", "other"];

/// Full image row from the `tree_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeImage {
    pub id: DbId,
    pub tree_id: DbId,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub classification: String,
    pub tags: Vec<String>,
    pub uploaded_by: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// DTO for inserting a new image record after the file has been stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreeImage {
    pub tree_id: DbId,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub classification: String,
    pub tags: Vec<String>,
    pub uploaded_by: Option<DbId>,
}
