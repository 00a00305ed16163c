//! Repository for the `tree_images` table.

use sqlx::{PgConnection, PgPool};

use canopy_core::types::DbId;

use crate::models::tree_image::{CreateTreeImage, TreeImage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tree_id, file_path, thumbnail_path, mime_type, size_bytes, \
    classification, tags, uploaded_by, is_active, created_at";

/// Provides CRUD operations for tree images.
pub struct TreeImageRepo;

impl TreeImageRepo {
    /// Insert a new image record, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTreeImage) -> Result<TreeImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO tree_images \
                (tree_id, file_path, thumbnail_path, mime_type, size_bytes, classification, tags, uploaded_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TreeImage>(&query)
            .bind(input.tree_id)
            .bind(&input.file_path)
            .bind(&input.thumbnail_path)
            .bind(&input.mime_type)
            .bind(input.size_bytes)
            .bind(&input.classification)
            .bind(&input.tags)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    /// Find an active image by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TreeImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tree_images WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, TreeImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active images for a tree, newest first.
    pub async fn list_for_tree(pool: &PgPool, tree_id: DbId) -> Result<Vec<TreeImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tree_images WHERE tree_id = $1 AND is_active = true \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, TreeImage>(&query)
            .bind(tree_id)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete an image by setting `is_active = false`.
    ///
    /// Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tree_images SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deactivate every active image owned by the given trees.
    ///
    /// Used by the hard-delete cascade inside its transaction. Returns the
    /// number of images deactivated.
    pub async fn deactivate_for_trees(
        conn: &mut PgConnection,
        tree_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tree_images SET is_active = false \
             WHERE tree_id = ANY($1) AND is_active = true",
        )
        .bind(tree_ids)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
