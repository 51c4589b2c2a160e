use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Normalized record of one HTTP response, bound into the execution
/// context under `<requestName>.response` once the request completes.
/// Header names are lower-cased; `body` is the parsed JSON document when
/// the payload parses, the raw text otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub raw_body: String,
    pub response_time: u64,
    pub size: u64,
    pub url: String,
    pub method: String,
}

impl ResponseRecord {
    /// Parse a response payload as JSON, falling back to the raw text.
    pub fn parse_body(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}
