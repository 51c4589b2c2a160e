//! # Environment Files
//!
//! Variable files come in two shapes, auto-detected on load:
//!
//! - a flat `key: value` mapping, used as-is;
//! - a structured document with optional `globals` and named
//!   `environments`, where selecting a name merges the globals first and
//!   the named environment's variables over them.
//!
//! The resolved flat map seeds the run's execution context under `env`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::collection::{parse_document, read_file, LoadError};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EnvironmentFile {
    Structured {
        #[serde(default)]
        globals: HashMap<String, String>,
        environments: HashMap<String, HashMap<String, String>>,
    },
    Flat(HashMap<String, String>),
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Environment `{0}` is not defined in the environment file")]
    UnknownEnvironment(String),
    #[error("The environment file defines named environments; one must be selected")]
    SelectionRequired,
}

/// Load an environment file and resolve it to a flat variable map.
/// `name` selects a named environment from a structured file and is
/// ignored for flat files.
pub fn load_environment(
    path: impl AsRef<Path>,
    name: Option<&str>,
) -> Result<HashMap<String, String>, EnvironmentError> {
    let path = path.as_ref();
    let raw = read_file(path)?;
    let file: EnvironmentFile = parse_document(path, &raw)?;

    match file {
        EnvironmentFile::Flat(vars) => Ok(vars),
        EnvironmentFile::Structured {
            globals,
            environments,
        } => {
            let name = name.ok_or(EnvironmentError::SelectionRequired)?;
            let selected = environments
                .get(name)
                .ok_or_else(|| EnvironmentError::UnknownEnvironment(name.to_string()))?;
            let mut vars = globals;
            vars.extend(selected.clone());
            Ok(vars)
        }
    }
}
