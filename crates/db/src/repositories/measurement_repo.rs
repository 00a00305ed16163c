//! Repository for the `measurements` table.
//!
//! Measurements are append-only: the only writes are inserts.

use sqlx::{PgConnection, PgPool};

use canopy_core::bulk::NewMeasurementRow;
use canopy_core::types::DbId;

use crate::models::measurement::{CreateMeasurement, Measurement};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tree_id, height_m, diameter_cm, health, co2_absorbed_kg, \
    notes, measured_by, measured_at, created_at";

/// Provides append and query operations for measurements.
pub struct MeasurementRepo;

impl MeasurementRepo {
    /// Append a single measurement to a tree.
    pub async fn insert(
        pool: &PgPool,
        tree_id: DbId,
        measured_by: Option<DbId>,
        input: &CreateMeasurement,
    ) -> Result<Measurement, sqlx::Error> {
        let query = format!(
            "INSERT INTO measurements \
                (tree_id, height_m, diameter_cm, health, co2_absorbed_kg, notes, measured_by, measured_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(tree_id)
            .bind(input.height_m)
            .bind(input.diameter_cm)
            .bind(&input.health)
            .bind(input.co2_absorbed_kg)
            .bind(&input.notes)
            .bind(measured_by)
            .bind(input.measured_at)
            .fetch_one(pool)
            .await
    }

    /// Append all measurements for one tree in a single multi-row INSERT.
    ///
    /// Used by the bulk measurement endpoint inside its transaction; each
    /// distinct tree in the batch gets exactly one call.
    pub async fn bulk_append(
        conn: &mut PgConnection,
        tree_id: DbId,
        measured_by: Option<DbId>,
        rows: &[NewMeasurementRow],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query = String::from(
            "INSERT INTO measurements \
                (tree_id, height_m, diameter_cm, health, co2_absorbed_kg, notes, measured_by, measured_at) \
             VALUES ",
        );
        let mut param_idx = 1u32;
        let mut first = true;

        for _ in rows {
            if !first {
                query.push_str(", ");
            }
            first = false;
            query.push_str(&format!(
                "(${}, ${}, ${}, ${}, ${}, ${}, ${}, COALESCE(${}, NOW()))",
                param_idx,
                param_idx + 1,
                param_idx + 2,
                param_idx + 3,
                param_idx + 4,
                param_idx + 5,
                param_idx + 6,
                param_idx + 7,
            ));
            param_idx += 8;
        }

        let mut q = sqlx::query(&query);
        for row in rows {
            q = q
                .bind(tree_id)
                .bind(row.height_m)
                .bind(row.diameter_cm)
                .bind(row.health.map(|h| h.as_str()))
                .bind(row.co2_absorbed_kg)
                .bind(&row.notes)
                .bind(measured_by)
                .bind(row.measured_at);
        }

        let result = q.execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// List measurements for a tree ordered by measurement time.
    pub async fn list_for_tree(
        pool: &PgPool,
        tree_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Measurement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM measurements WHERE tree_id = $1 \
             ORDER BY measured_at ASC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(tree_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// The most recent measurement for a tree, if any.
    pub async fn latest_for_tree(
        pool: &PgPool,
        tree_id: DbId,
    ) -> Result<Option<Measurement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM measurements WHERE tree_id = $1 \
             ORDER BY measured_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(tree_id)
            .fetch_optional(pool)
            .await
    }

    /// Count measurements recorded for a tree.
    pub async fn count_for_tree(pool: &PgPool, tree_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM measurements WHERE tree_id = $1")
            .bind(tree_id)
            .fetch_one(pool)
            .await
    }
}
