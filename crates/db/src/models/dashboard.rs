//! Result rows for the dashboard aggregation queries.
//!
//! These are read-only projections; no DTOs exist here.

use serde::Serialize;
use sqlx::FromRow;

use canopy_core::types::{DbId, Timestamp};

/// Top-level counters for the dashboard overview.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_forests: i64,
    pub total_trees: i64,
    pub alive_trees: i64,
    pub dead_trees: i64,
    pub total_measurements: i64,
    pub total_co2_absorbed_kg: f64,
}

/// Tree count per species.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesCount {
    pub species: String,
    pub count: i64,
}

/// Measurement count per health state (latest measurement per tree).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCount {
    pub health: String,
    pub count: i64,
}

/// Latest recorded height for a tree.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestHeight {
    pub tree_id: DbId,
    pub tree_code: String,
    pub species: String,
    pub height_m: Option<f64>,
    pub measured_at: Timestamp,
}

/// Per-forest comparison row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestComparison {
    pub forest_id: DbId,
    pub forest_name: String,
    pub tree_count: i64,
    pub alive_count: i64,
    pub species_count: i64,
    pub total_co2_absorbed_kg: f64,
}
