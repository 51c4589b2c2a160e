//! # Template Interpolation
//!
//! Resolves `{{path}}` placeholders against the execution context of a
//! collection run. Paths are dotted, with optional `name[n]` array
//! indexing, so chained references like `login.response.body.token`
//! reach into earlier responses. `env.`-prefixed paths read environment
//! variables instead.
//!
//! Placeholders that fail to resolve are left in the text verbatim, so a
//! broken chain shows up in the dispatched request instead of collapsing
//! into an empty string.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::runner::ExecutionContext;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern"));

/// Resolve a dotted path like `user.profile.name` or `users[0].name`
/// against a JSON value. Any missing key, non-object intermediate,
/// non-array indexed value, or malformed index resolves to `None`.
///
/// Literal dots inside keys are not escapable; a key containing a dot is
/// unreachable through this resolver.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        let (key, index) = parse_segment(segment)?;
        current = current.as_object()?.get(key)?;
        if let Some(index) = index {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.strip_suffix(']') {
        Some(rest) => {
            let (key, index) = rest.split_once('[')?;
            Some((key, Some(index.parse().ok()?)))
        }
        None => Some((segment, None)),
    }
}

/// Substitute every `{{path}}` placeholder in `text` against the context.
/// Unresolved placeholders stay in place verbatim, which makes repeated
/// interpolation of the same string stable.
pub fn interpolate(text: &str, context: &ExecutionContext) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let path = caps[1].trim();
            let resolved = match path.strip_prefix("env.") {
                Some(name) => context.env_var(name),
                None => context.get(path).map(value_text),
            };
            resolved.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Apply [`interpolate`] recursively: arrays element-wise, objects
/// value-wise (keys are never interpolated), other scalars untouched.
pub fn interpolate_deep(value: &Value, context: &ExecutionContext) -> Value {
    match value {
        Value::String(text) => Value::String(interpolate(text, context)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_deep(item, context))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), interpolate_deep(item, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Textual form of a resolved value as it appears inside a substituted
/// string: strings verbatim, everything else as compact JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
