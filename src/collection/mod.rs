//! # Collections
//!
//! A collection is a named, ordered list of request definitions plus
//! optional assertions. Order is significant: it defines the implicit
//! chaining graph, since a request may only reference responses of
//! requests declared before it.
//!
//! Collections load from YAML or JSON documents; the on-disk format maps
//! one-to-one onto these serde models.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::assertions::AssertionMap;

/// A reusable suite of HTTP requests, executed in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    pub requests: Vec<RequestSpec>,
}

/// One declaratively defined request. `name` is the chaining key under
/// which the response is bound for later requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub name: String,
    #[serde(default)]
    pub method: Option<String>,
    pub url: String,
    #[serde(default)]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assert: Option<AssertionMap>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse `{path}`: {message}")]
    Parse { path: String, message: String },
}

impl Collection {
    /// Load a collection document. `.json` parses as JSON, anything else
    /// as YAML (which accepts JSON documents as well).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = read_file(path)?;
        parse_document(path, &raw)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn parse_document<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, LoadError> {
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(raw).map_err(|err| err.to_string()),
        _ => serde_yaml::from_str(raw).map_err(|err| err.to_string()),
    };
    parsed.map_err(|message| LoadError::Parse {
        path: path.display().to_string(),
        message,
    })
}
