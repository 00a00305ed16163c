//! Geographic coordinate validation and the wire-format point type.

use serde::Deserialize;

/// A GeoJSON-style point as submitted by clients: `{"coordinates": [lon, lat]}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeoPoint {
    /// `[longitude, latitude]`, GeoJSON axis order.
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Inclusive latitude bounds in decimal degrees.
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Inclusive longitude bounds in decimal degrees.
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Validate a latitude value. Returns a human-readable error on failure.
pub fn validate_latitude(latitude: f64) -> Result<(), String> {
    if !latitude.is_finite() || latitude < LATITUDE_RANGE.0 || latitude > LATITUDE_RANGE.1 {
        return Err(format!(
            "Latitude must be between {} and {}",
            LATITUDE_RANGE.0, LATITUDE_RANGE.1
        ));
    }
    Ok(())
}

/// Validate a longitude value. Returns a human-readable error on failure.
pub fn validate_longitude(longitude: f64) -> Result<(), String> {
    if !longitude.is_finite() || longitude < LONGITUDE_RANGE.0 || longitude > LONGITUDE_RANGE.1 {
        return Err(format!(
            "Longitude must be between {} and {}",
            LONGITUDE_RANGE.0, LONGITUDE_RANGE.1
        ));
    }
    Ok(())
}

/// Validate a (latitude, longitude) pair.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), String> {
    validate_latitude(latitude)?;
    validate_longitude(longitude)
}
