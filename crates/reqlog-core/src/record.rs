//! Core data model for reqlog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One captured HTTP request/response exchange.
///
/// A record is fully populated by the capture layer after the response is
/// produced and is immutable from submission onward; every later stage
/// (queue, writer, sink) only moves or reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    /// Correlation id: the incoming `x-request-id` header when present,
    /// otherwise a generated UUIDv7.
    pub request_id: String,
    /// Name of the reporting service (`SERVICE_NAME`).
    pub service_name: String,
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub status_code: i32,
    pub remote_ip: String,
    pub user_agent: String,
    pub content_type: String,
    /// Wall-clock handler duration in seconds.
    pub request_time: f64,
    pub created_at: DateTime<Utc>,
    /// Uploaded file name; only set for multipart captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Uploaded file size in bytes; only set for multipart captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    /// Classified body content. `None` when nothing was captured for
    /// this request (see [`crate::classify_content`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_json: Option<JsonValue>,
}
