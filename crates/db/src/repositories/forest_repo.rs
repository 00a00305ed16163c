//! Repository for the `forests` table.

use sqlx::{PgConnection, PgPool};

use canopy_core::types::DbId;

use crate::models::forest::{CreateForest, Forest, UpdateForest};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, region, latitude, longitude, area, area_unit, \
    established_at, is_active, created_at, updated_at";

/// Provides CRUD operations for forests.
pub struct ForestRepo;

impl ForestRepo {
    /// Insert a new forest, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateForest) -> Result<Forest, sqlx::Error> {
        let query = format!(
            "INSERT INTO forests (name, region, latitude, longitude, area, area_unit, established_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'hectares'), $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Forest>(&query)
            .bind(&input.name)
            .bind(&input.region)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.area)
            .bind(&input.area_unit)
            .bind(input.established_at)
            .fetch_one(pool)
            .await
    }

    /// Find a forest by internal ID (active only).
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Forest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forests WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, Forest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// True when an active forest with the given id exists.
    pub async fn exists_active(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM forests WHERE id = $1 AND is_active = true)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Of the given ids, return those with no active forest row.
    ///
    /// Used by the bulk create path to verify every referenced forest in
    /// one lookup before inserting.
    pub async fn missing_active_ids(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, DbId>(
            "SELECT wanted.id FROM UNNEST($1::BIGINT[]) AS wanted(id) \
             WHERE NOT EXISTS ( \
                SELECT 1 FROM forests f WHERE f.id = wanted.id AND f.is_active = true \
             )",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }

    /// List forests ordered by name, optionally including inactive ones.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Forest>, sqlx::Error> {
        let query = if include_inactive {
            format!("SELECT {COLUMNS} FROM forests ORDER BY name")
        } else {
            format!("SELECT {COLUMNS} FROM forests WHERE is_active = true ORDER BY name")
        };
        sqlx::query_as::<_, Forest>(&query).fetch_all(pool).await
    }

    /// Update a forest. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no active row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateForest,
    ) -> Result<Option<Forest>, sqlx::Error> {
        let query = format!(
            "UPDATE forests SET \
                name = COALESCE($2, name), \
                region = COALESCE($3, region), \
                latitude = COALESCE($4, latitude), \
                longitude = COALESCE($5, longitude), \
                area = COALESCE($6, area), \
                area_unit = COALESCE($7, area_unit), \
                established_at = COALESCE($8, established_at), \
                updated_at = NOW() \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Forest>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.region)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.area)
            .bind(&input.area_unit)
            .bind(input.established_at)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a forest by setting `is_active = false`.
    ///
    /// Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE forests SET is_active = false, updated_at = NOW() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
