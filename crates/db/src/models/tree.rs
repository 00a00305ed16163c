//! Tree entity model, DTOs, and list/selection filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use canopy_core::bulk::NewMeasurementRow;
use canopy_core::types::{DbId, Timestamp};

/// Full tree row from the `trees` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: DbId,
    pub tree_code: String,
    pub forest_id: DbId,
    pub species: String,
    pub planted_at: NaiveDate,
    pub died_at: Option<NaiveDate>,
    pub is_alive: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a single tree.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTree {
    pub tree_code: Option<String>,
    pub forest_id: DbId,
    pub species: String,
    pub planted_at: Option<NaiveDate>,
    pub is_alive: Option<bool>,
    pub latitude: f64,
    pub longitude: f64,
}

/// DTO for updating an existing tree. All fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTree {
    pub forest_id: Option<DbId>,
    pub species: Option<String>,
    pub planted_at: Option<NaiveDate>,
    pub died_at: Option<NaiveDate>,
    pub is_alive: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Filter parameters for listing trees and for resolving bulk selections.
///
/// All fields combine with AND. Soft-deleted trees are always excluded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeFilter {
    pub forest_id: Option<DbId>,
    pub forest_ids: Option<Vec<DbId>>,
    pub species: Option<String>,
    pub is_alive: Option<bool>,
    pub planted_after: Option<NaiveDate>,
    pub planted_before: Option<NaiveDate>,
}

/// Field-level changes applied by a bulk tree update.
///
/// `add_measurement` appends one measurement row per selected tree instead
/// of overwriting anything; all other fields are plain column updates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTreeUpdates {
    pub forest_id: Option<DbId>,
    pub species: Option<String>,
    pub planted_at: Option<NaiveDate>,
    pub died_at: Option<NaiveDate>,
    pub is_alive: Option<bool>,
    pub add_measurement: Option<NewMeasurementRow>,
}

impl BulkTreeUpdates {
    /// True when no column-level change is requested (only a measurement
    /// append, or nothing at all).
    pub fn has_column_updates(&self) -> bool {
        self.forest_id.is_some()
            || self.species.is_some()
            || self.planted_at.is_some()
            || self.died_at.is_some()
            || self.is_alive.is_some()
    }

    /// True when the update carries no effect at all.
    pub fn is_empty(&self) -> bool {
        !self.has_column_updates() && self.add_measurement.is_none()
    }
}
