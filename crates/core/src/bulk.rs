//! Batch validation rules for the bulk write endpoints.
//!
//! The `core` crate contains no database dependencies; all validation is
//! done against row data passed in by the caller. Row errors are collected
//! exhaustively so a caller can fix every bad row in one resubmission
//! instead of discovering them one request at a time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geo::{validate_coordinates, GeoPoint};
use crate::health::HealthStatus;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard ceiling on the number of rows affected by a single bulk call.
pub const MAX_BULK_ROWS: usize = 1000;

// ---------------------------------------------------------------------------
// Row error
// ---------------------------------------------------------------------------

/// A single row-level validation failure, addressable by input index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Zero-based index of the offending row in the submitted batch.
    pub index: usize,
    /// Name of the field that failed validation.
    pub field: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl RowError {
    pub fn new(index: usize, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            index,
            field,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One tree descriptor in a bulk create request.
///
/// Fields the request omits are filled from the batch-level defaults before
/// validation runs (see [`apply_tree_defaults`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTreeRow {
    pub tree_code: Option<String>,
    pub species: Option<String>,
    pub forest_id: Option<DbId>,
    pub planted_at: Option<NaiveDate>,
    pub is_alive: Option<bool>,
    /// GeoJSON-style point; takes precedence over the flat fields below.
    pub location: Option<GeoPoint>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl NewTreeRow {
    /// Resolved `(latitude, longitude)`, from whichever form the row used.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        if let Some(point) = self.location {
            return Some((point.latitude(), point.longitude()));
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// One measurement descriptor in a bulk measurement-append request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurementRow {
    pub tree_id: Option<DbId>,
    pub height_m: Option<f64>,
    pub diameter_cm: Option<f64>,
    pub health: Option<HealthStatus>,
    pub co2_absorbed_kg: Option<f64>,
    pub notes: Option<String>,
    pub measured_at: Option<Timestamp>,
}

impl NewMeasurementRow {
    /// True when at least one measurement value is present.
    pub fn has_any_value(&self) -> bool {
        self.height_m.is_some()
            || self.diameter_cm.is_some()
            || self.health.is_some()
            || self.co2_absorbed_kg.is_some()
            || self.notes.is_some()
    }
}

// ---------------------------------------------------------------------------
// Batch-size validation
// ---------------------------------------------------------------------------

/// Validate that a batch stays within the hard row ceiling.
///
/// `noun` names the affected row kind for the error message ("trees",
/// "measurements").
pub fn validate_batch_size(count: usize, noun: &str) -> Result<(), String> {
    if count == 0 {
        return Err(format!("At least one of {noun} is required"));
    }
    if count > MAX_BULK_ROWS {
        return Err(format!(
            "Maximum {MAX_BULK_ROWS} {noun} per bulk operation (got {count})"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tree row validation
// ---------------------------------------------------------------------------

/// Fill per-row gaps from the batch-level defaults.
///
/// The default forest applies only where the row names none; planting date
/// defaults to `today` and liveness to `true`.
pub fn apply_tree_defaults(rows: &mut [NewTreeRow], default_forest_id: Option<DbId>, today: NaiveDate) {
    for row in rows.iter_mut() {
        if row.forest_id.is_none() {
            row.forest_id = default_forest_id;
        }
        if row.planted_at.is_none() {
            row.planted_at = Some(today);
        }
        if row.is_alive.is_none() {
            row.is_alive = Some(true);
        }
    }
}

/// Validate every row of a tree create batch, collecting all failures.
///
/// Returns an empty vector when the batch is valid. Never stops at the
/// first bad row.
pub fn validate_tree_rows(rows: &[NewTreeRow]) -> Vec<RowError> {
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match row.species.as_deref() {
            None => errors.push(RowError::new(index, "species", "Species is required")),
            Some(s) if s.trim().is_empty() => {
                errors.push(RowError::new(index, "species", "Species must not be empty"))
            }
            Some(_) => {}
        }

        if row.forest_id.is_none() {
            errors.push(RowError::new(
                index,
                "forestId",
                "A forest reference is required (per row or as batch default)",
            ));
        }

        match row.coordinates() {
            Some((lat, lon)) => {
                if let Err(msg) = validate_coordinates(lat, lon) {
                    errors.push(RowError::new(index, "location", msg));
                }
            }
            None => errors.push(RowError::new(
                index,
                "location",
                "Coordinates (latitude, longitude) are required",
            )),
        }
    }

    errors
}

// ---------------------------------------------------------------------------
// Measurement row validation & grouping
// ---------------------------------------------------------------------------

/// Validate every row of a measurement-append batch, collecting all failures.
pub fn validate_measurement_rows(rows: &[NewMeasurementRow]) -> Vec<RowError> {
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if row.tree_id.is_none() {
            errors.push(RowError::new(index, "treeId", "A tree reference is required"));
        }
        if !row.has_any_value() {
            errors.push(RowError::new(
                index,
                "measurement",
                "At least one measurement value is required",
            ));
        }
    }

    errors
}

/// Group measurement rows by tree so each tree receives one append
/// operation carrying all of its new measurements.
///
/// Trees appear in first-seen order; rows keep their input order within
/// each group. Rows without a tree reference must have been rejected by
/// [`validate_measurement_rows`] before calling this.
pub fn group_measurements_by_tree(
    rows: Vec<NewMeasurementRow>,
) -> Vec<(DbId, Vec<NewMeasurementRow>)> {
    let mut groups: Vec<(DbId, Vec<NewMeasurementRow>)> = Vec::new();

    for row in rows {
        let Some(tree_id) = row.tree_id else { continue };
        match groups.iter_mut().find(|(id, _)| *id == tree_id) {
            Some((_, group)) => group.push(row),
            None => groups.push((tree_id, vec![row])),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_row(species: Option<&str>, forest_id: Option<DbId>, coords: Option<(f64, f64)>) -> NewTreeRow {
        NewTreeRow {
            tree_code: None,
            species: species.map(String::from),
            forest_id,
            planted_at: None,
            is_alive: None,
            location: None,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
        }
    }

    fn measurement_row(tree_id: Option<DbId>, height: Option<f64>) -> NewMeasurementRow {
        NewMeasurementRow {
            tree_id,
            height_m: height,
            diameter_cm: None,
            health: None,
            co2_absorbed_kg: None,
            notes: None,
            measured_at: None,
        }
    }

    #[test]
    fn test_batch_size_within_limit() {
        assert!(validate_batch_size(1, "trees").is_ok());
        assert!(validate_batch_size(MAX_BULK_ROWS, "trees").is_ok());
    }

    #[test]
    fn test_batch_size_exceeds_limit() {
        let err = validate_batch_size(MAX_BULK_ROWS + 1, "trees").unwrap_err();
        assert!(err.contains("Maximum 1000 trees"), "got: {err}");
        assert!(err.contains("1001"));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(validate_batch_size(0, "measurements").is_err());
    }

    #[test]
    fn test_valid_rows_produce_no_errors() {
        let rows = vec![
            tree_row(Some("Oak"), Some(1), Some((59.33, 18.07))),
            tree_row(Some("Pine"), Some(1), Some((59.34, 18.08))),
        ];
        assert!(validate_tree_rows(&rows).is_empty());
    }

    #[test]
    fn test_all_row_errors_are_collected() {
        // Row 0: missing species. Row 1: valid. Row 2: missing forest AND
        // coordinates. Every failure must be reported, not just the first.
        let rows = vec![
            tree_row(None, Some(1), Some((1.0, 2.0))),
            tree_row(Some("Birch"), Some(1), Some((1.0, 2.0))),
            tree_row(Some("Elm"), None, None),
        ];
        let errors = validate_tree_rows(&rows);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].index, 0);
        assert_eq!(errors[0].field, "species");
        assert_eq!(errors[1].index, 2);
        assert_eq!(errors[1].field, "forestId");
        assert_eq!(errors[2].index, 2);
        assert_eq!(errors[2].field, "location");
    }

    #[test]
    fn test_geojson_location_is_accepted() {
        // Clients may submit GeoJSON axis order instead of flat fields.
        let row = NewTreeRow {
            location: Some(crate::geo::GeoPoint {
                coordinates: [18.07, 59.33], // [lon, lat]
            }),
            ..tree_row(Some("Oak"), Some(1), None)
        };
        assert_eq!(row.coordinates(), Some((59.33, 18.07)));
        assert!(validate_tree_rows(&[row]).is_empty());
    }

    #[test]
    fn test_out_of_range_coordinates_flagged_per_row() {
        let rows = vec![tree_row(Some("Oak"), Some(1), Some((95.0, 18.0)))];
        let errors = validate_tree_rows(&rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "location");
        assert!(errors[0].message.contains("Latitude"));
    }

    #[test]
    fn test_defaults_fill_only_missing_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let explicit_date = NaiveDate::from_ymd_opt(2020, 5, 20).unwrap();

        let mut rows = vec![
            tree_row(Some("Oak"), None, Some((1.0, 2.0))),
            NewTreeRow {
                planted_at: Some(explicit_date),
                is_alive: Some(false),
                ..tree_row(Some("Pine"), Some(7), Some((1.0, 2.0)))
            },
        ];
        apply_tree_defaults(&mut rows, Some(3), today);

        assert_eq!(rows[0].forest_id, Some(3));
        assert_eq!(rows[0].planted_at, Some(today));
        assert_eq!(rows[0].is_alive, Some(true));

        // Explicit values survive.
        assert_eq!(rows[1].forest_id, Some(7));
        assert_eq!(rows[1].planted_at, Some(explicit_date));
        assert_eq!(rows[1].is_alive, Some(false));
    }

    #[test]
    fn test_measurement_rows_collect_all_errors() {
        let rows = vec![
            measurement_row(None, Some(4.2)),
            measurement_row(Some(1), None),
            measurement_row(None, None),
        ];
        let errors = validate_measurement_rows(&rows);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0].index, 0);
        assert_eq!(errors[0].field, "treeId");
        assert_eq!(errors[1].index, 1);
        assert_eq!(errors[1].field, "measurement");
        // Row 2 fails both checks.
        assert_eq!(errors[2].index, 2);
        assert_eq!(errors[3].index, 2);
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let rows = vec![
            measurement_row(Some(5), Some(1.0)),
            measurement_row(Some(3), Some(2.0)),
            measurement_row(Some(5), Some(3.0)),
        ];
        let groups = group_measurements_by_tree(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 5);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[0].height_m, Some(1.0));
        assert_eq!(groups[0].1[1].height_m, Some(3.0));
        assert_eq!(groups[1].0, 3);
        assert_eq!(groups[1].1.len(), 1);
    }
}
