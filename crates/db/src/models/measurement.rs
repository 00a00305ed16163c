//! Measurement entity model and DTOs.
//!
//! Measurements are append-only: no update DTO exists.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use canopy_core::types::{DbId, Timestamp};

/// Full measurement row from the `measurements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: DbId,
    pub tree_id: DbId,
    pub height_m: Option<f64>,
    pub diameter_cm: Option<f64>,
    pub health: Option<String>,
    pub co2_absorbed_kg: Option<f64>,
    pub notes: Option<String>,
    pub measured_by: Option<DbId>,
    pub measured_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for appending a measurement to a tree.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeasurement {
    pub height_m: Option<f64>,
    pub diameter_cm: Option<f64>,
    pub health: Option<String>,
    pub co2_absorbed_kg: Option<f64>,
    pub notes: Option<String>,
    pub measured_at: Option<Timestamp>,
}
