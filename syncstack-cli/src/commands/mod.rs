//! Command handlers. Each one turns an engine or gateway call into the JSON
//! object printed for the invocation.
//!
//! - `status`: working-copy status, detailed status and file diffs
//! - `sync`: single and batch sync
//! - `snapshots`: backup branch listing and restore
//! - `scan`: local working-copy discovery
//! - `remote`: hosting API pass-throughs

pub mod remote;
pub mod scan;
pub mod snapshots;
pub mod status;
pub mod sync;

use serde::Serialize;
use serde_json::{json, Value};

/// Response wrapper: `success` plus the payload's fields, or a `message`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn into_json(self) -> Value {
        to_json(&self)
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// `{"success": false, "message": ...}`
pub fn failure(message: impl Into<String>) -> Value {
    json!({ "success": false, "message": message.into() })
}

/// Serializes a result value, falling back to a failure object.
pub fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize response: {}", e);
        failure(format!("Failed to serialize response: {}", e))
    })
}

pub fn print_json(value: &Value) {
    println!("{}", value);
}
