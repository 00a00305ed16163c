//! Forest entity model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use canopy_core::types::{DbId, Timestamp};

/// Full forest row from the `forests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forest {
    pub id: DbId,
    pub name: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area: f64,
    pub area_unit: String,
    pub established_at: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new forest.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateForest {
    pub name: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area: f64,
    pub area_unit: Option<String>,
    pub established_at: Option<NaiveDate>,
}

/// DTO for updating an existing forest. All fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateForest {
    pub name: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub area: Option<f64>,
    pub area_unit: Option<String>,
    pub established_at: Option<NaiveDate>,
}
