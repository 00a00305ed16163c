//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "success": ..., "message": ..., "data": ... }`
//! envelope. Use [`ApiResponse`] instead of ad-hoc `serde_json::json!` so
//! every endpoint serializes the same shape.

use serde::Serialize;

/// Standard success envelope.
///
/// `message` and `data` are omitted from the JSON when absent.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success with a data payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Success with a data payload and a human-readable message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success with a message only (no data).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
