//! Tree health states recorded with each measurement.

use serde::{Deserialize, Serialize};

/// Health assessment attached to a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    /// All valid states, in descending order of vigor.
    pub const ALL: [HealthStatus; 5] = [
        HealthStatus::Excellent,
        HealthStatus::Good,
        HealthStatus::Fair,
        HealthStatus::Poor,
        HealthStatus::Critical,
    ];

    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }

    /// Parse from a string value, returning a human-readable error listing
    /// the valid states.
    pub fn from_str_value(value: &str) -> Result<Self, String> {
        match value {
            "excellent" => Ok(HealthStatus::Excellent),
            "good" => Ok(HealthStatus::Good),
            "fair" => Ok(HealthStatus::Fair),
            "poor" => Ok(HealthStatus::Poor),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(format!(
                "Invalid health status '{other}'. Valid values: excellent, good, fair, poor, critical"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_states() {
        for status in HealthStatus::ALL {
            let parsed = HealthStatus::from_str_value(status.as_str()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_invalid_value_lists_alternatives() {
        let err = HealthStatus::from_str_value("thriving").unwrap_err();
        assert!(err.contains("thriving"));
        assert!(err.contains("excellent"));
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Good).unwrap();
        assert_eq!(json, "\"good\"");
    }
}
