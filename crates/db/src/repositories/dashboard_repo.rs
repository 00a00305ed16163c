//! Dashboard aggregation queries.
//!
//! These are declarative GROUP BY projections over the live data; there is
//! no control flow here beyond parameter binding.

use sqlx::PgPool;

use canopy_core::types::DbId;

use crate::models::dashboard::{
    ForestComparison, HealthCount, LatestHeight, OverviewStats, SpeciesCount,
};

/// Provides read-only aggregation queries for the dashboard endpoints.
pub struct DashboardRepo;

impl DashboardRepo {
    /// Top-level counters: forests, trees, liveness split, measurements,
    /// total CO2 absorption.
    pub async fn overview(pool: &PgPool) -> Result<OverviewStats, sqlx::Error> {
        sqlx::query_as::<_, OverviewStats>(
            "SELECT \
                (SELECT COUNT(*)::BIGINT FROM forests WHERE is_active = true) AS total_forests, \
                (SELECT COUNT(*)::BIGINT FROM trees WHERE is_active = true) AS total_trees, \
                (SELECT COUNT(*)::BIGINT FROM trees WHERE is_active = true AND is_alive = true) AS alive_trees, \
                (SELECT COUNT(*)::BIGINT FROM trees WHERE is_active = true AND is_alive = false) AS dead_trees, \
                (SELECT COUNT(*)::BIGINT FROM measurements m \
                    JOIN trees t ON t.id = m.tree_id WHERE t.is_active = true) AS total_measurements, \
                (SELECT COALESCE(SUM(m.co2_absorbed_kg), 0)::DOUBLE PRECISION FROM measurements m \
                    JOIN trees t ON t.id = m.tree_id WHERE t.is_active = true) AS total_co2_absorbed_kg",
        )
        .fetch_one(pool)
        .await
    }

    /// Tree count per species, optionally scoped to one forest.
    pub async fn species_distribution(
        pool: &PgPool,
        forest_id: Option<DbId>,
    ) -> Result<Vec<SpeciesCount>, sqlx::Error> {
        sqlx::query_as::<_, SpeciesCount>(
            "SELECT species, COUNT(*)::BIGINT AS count \
             FROM trees \
             WHERE is_active = true AND ($1::BIGINT IS NULL OR forest_id = $1) \
             GROUP BY species \
             ORDER BY count DESC, species",
        )
        .bind(forest_id)
        .fetch_all(pool)
        .await
    }

    /// Count of trees per health state, judged by each tree's latest
    /// measurement that carries a health value.
    pub async fn health_distribution(
        pool: &PgPool,
        forest_id: Option<DbId>,
    ) -> Result<Vec<HealthCount>, sqlx::Error> {
        sqlx::query_as::<_, HealthCount>(
            "SELECT latest.health, COUNT(*)::BIGINT AS count \
             FROM ( \
                SELECT DISTINCT ON (m.tree_id) m.tree_id, m.health \
                FROM measurements m \
                JOIN trees t ON t.id = m.tree_id \
                WHERE t.is_active = true \
                  AND m.health IS NOT NULL \
                  AND ($1::BIGINT IS NULL OR t.forest_id = $1) \
                ORDER BY m.tree_id, m.measured_at DESC \
             ) AS latest \
             GROUP BY latest.health \
             ORDER BY count DESC",
        )
        .bind(forest_id)
        .fetch_all(pool)
        .await
    }

    /// Latest recorded height per tree, tallest first.
    pub async fn latest_heights(
        pool: &PgPool,
        forest_id: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<LatestHeight>, sqlx::Error> {
        sqlx::query_as::<_, LatestHeight>(
            "SELECT latest.tree_id, t.tree_code, t.species, latest.height_m, latest.measured_at \
             FROM ( \
                SELECT DISTINCT ON (m.tree_id) m.tree_id, m.height_m, m.measured_at \
                FROM measurements m \
                WHERE m.height_m IS NOT NULL \
                ORDER BY m.tree_id, m.measured_at DESC \
             ) AS latest \
             JOIN trees t ON t.id = latest.tree_id \
             WHERE t.is_active = true AND ($1::BIGINT IS NULL OR t.forest_id = $1) \
             ORDER BY latest.height_m DESC NULLS LAST \
             LIMIT $2",
        )
        .bind(forest_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Per-forest comparison: tree counts, liveness, species variety, CO2.
    pub async fn forest_comparison(pool: &PgPool) -> Result<Vec<ForestComparison>, sqlx::Error> {
        sqlx::query_as::<_, ForestComparison>(
            "SELECT f.id AS forest_id, f.name AS forest_name, \
                COUNT(t.id) AS tree_count, \
                COUNT(t.id) FILTER (WHERE t.is_alive) AS alive_count, \
                COUNT(DISTINCT t.species) AS species_count, \
                COALESCE(SUM(m.co2), 0)::DOUBLE PRECISION AS total_co2_absorbed_kg \
             FROM forests f \
             LEFT JOIN trees t ON t.forest_id = f.id AND t.is_active = true \
             LEFT JOIN ( \
                SELECT tree_id, SUM(co2_absorbed_kg) AS co2 \
                FROM measurements GROUP BY tree_id \
             ) AS m ON m.tree_id = t.id \
             WHERE f.is_active = true \
             GROUP BY f.id, f.name \
             ORDER BY f.name",
        )
        .fetch_all(pool)
        .await
    }
}
