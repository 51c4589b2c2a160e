//! # Response Assertions
//!
//! Evaluates a declarative assertion map against one HTTP response.
//! Target paths select what is checked: `status`, `responseTime`,
//! `headers.<name>`, or `body.<dotted path>`. Expectations are either a
//! literal value (equality) or an operator object whose entries are
//! ANDed together.
//!
//! Evaluation is total: unknown operators fail the assertion, unknown
//! target paths are skipped, and nothing here ever panics on authored
//! input. Assertion maps come from user-authored YAML, so a loose entry
//! must not bring down a run.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::ResponseRecord;
use crate::template::{resolve_path, value_text};

/// Assertion target paths mapped to their expectations, in authored order.
pub type AssertionMap = IndexMap<String, Value>;

/// Outcome of one assertion-map entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    pub path: String,
    pub expected: Value,
    pub actual: Option<Value>,
    pub passed: bool,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Exists,
}

impl Operator {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "eq" => Some(Operator::Eq),
            "ne" => Some(Operator::Ne),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "contains" => Some(Operator::Contains),
            "exists" => Some(Operator::Exists),
            _ => None,
        }
    }
}

/// Evaluate every recognized assertion entry against the response, in map
/// order. Entries with an unrecognized target path produce no result.
pub fn evaluate(response: &ResponseRecord, assertions: &AssertionMap) -> Vec<AssertionResult> {
    let mut results = Vec::new();
    for (path, expected) in assertions {
        let outcome = match path.as_str() {
            "status" => Some(check_status(response, expected)),
            "responseTime" => Some(check_response_time(path, response, expected)),
            target if target.starts_with("headers.") => Some(check_header(
                path,
                &target["headers.".len()..],
                response,
                expected,
            )),
            target if target.starts_with("body.") => Some(check_body(
                path,
                &target["body.".len()..],
                response,
                expected,
            )),
            _ => None,
        };
        if let Some((actual, passed, description)) = outcome {
            results.push(AssertionResult {
                path: path.clone(),
                expected: expected.clone(),
                actual,
                passed,
                description,
            });
        }
    }
    results
}

type Checked = (Option<Value>, bool, String);

fn check_status(response: &ResponseRecord, expected: &Value) -> Checked {
    let actual = Value::from(response.status);
    let passed = scalar_eq(Some(&actual), expected);
    (Some(actual), passed, format!("Status code is {expected}"))
}

fn check_response_time(path: &str, response: &ResponseRecord, expected: &Value) -> Checked {
    let actual = Value::from(response.response_time);
    match expected {
        Value::Object(ops) => {
            let passed = evaluate_operators(Some(&actual), ops);
            (
                Some(actual),
                passed,
                format!("{path} {}", describe_operators(ops)),
            )
        }
        literal => {
            let passed = scalar_eq(Some(&actual), literal);
            (
                Some(actual),
                passed,
                format!("Response time is {literal} ms"),
            )
        }
    }
}

fn check_header(path: &str, name: &str, response: &ResponseRecord, expected: &Value) -> Checked {
    let name = name.to_ascii_lowercase();
    let actual = response.headers.get(&name).cloned().map(Value::String);
    match expected {
        Value::Object(ops) => {
            let passed = evaluate_operators(actual.as_ref(), ops);
            (actual, passed, format!("{path} {}", describe_operators(ops)))
        }
        Value::String(want) => {
            // Exact match or substring containment, the lenient header check.
            let passed = actual
                .as_ref()
                .and_then(Value::as_str)
                .map(|have| have == want || have.contains(want.as_str()))
                .unwrap_or(false);
            (actual, passed, format!("{path} matches \"{want}\""))
        }
        literal => {
            let passed = scalar_eq(actual.as_ref(), literal);
            (actual, passed, format!("{path} equals {literal}"))
        }
    }
}

fn check_body(path: &str, rest: &str, response: &ResponseRecord, expected: &Value) -> Checked {
    let actual = resolve_path(&response.body, rest).cloned();
    match expected {
        Value::Object(ops) => {
            let passed = evaluate_operators(actual.as_ref(), ops);
            (actual, passed, format!("{path} {}", describe_operators(ops)))
        }
        literal => {
            let passed = actual.as_ref() == Some(literal);
            (actual, passed, format!("{path} equals {literal}"))
        }
    }
}

/// AND together all operator entries against an actual value. Short-circuits
/// on the first failing operator; an unknown operator keyword fails the
/// whole evaluation.
pub fn evaluate_operators(actual: Option<&Value>, ops: &Map<String, Value>) -> bool {
    for (keyword, value) in ops {
        let Some(op) = Operator::parse(keyword) else {
            return false;
        };
        if !apply_operator(op, actual, value) {
            return false;
        }
    }
    true
}

fn apply_operator(op: Operator, actual: Option<&Value>, value: &Value) -> bool {
    match op {
        Operator::Eq => scalar_eq(actual, value),
        Operator::Ne => !scalar_eq(actual, value),
        Operator::Gt => ordering(actual, value) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            ordering(actual, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => ordering(actual, value) == Some(Ordering::Less),
        Operator::Lte => matches!(
            ordering(actual, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Contains => contains(actual, value),
        Operator::Exists => {
            if truthy(value) {
                actual.is_some()
            } else {
                actual.is_none()
            }
        }
    }
}

/// Strict scalar equality: null, bool, string, and numeric comparison.
/// Composite operands never compare equal; deep structural checks go
/// through literal body expectations instead.
fn scalar_eq(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (Some(Value::Null), Value::Null) => true,
        (Some(Value::Bool(a)), Value::Bool(b)) => a == b,
        (Some(Value::String(a)), Value::String(b)) => a == b,
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Numbers compare numerically, strings lexicographically; any other
/// pairing has no ordering and the comparison operator evaluates false.
fn ordering(actual: Option<&Value>, value: &Value) -> Option<Ordering> {
    match (actual?, value) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

fn contains(actual: Option<&Value>, value: &Value) -> bool {
    match actual {
        Some(Value::String(text)) => text.contains(&value_text(value)),
        Some(Value::Array(items)) => items.iter().any(|item| scalar_eq(Some(item), value)),
        _ => false,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn describe_operators(ops: &Map<String, Value>) -> String {
    let parts: Vec<String> = ops
        .iter()
        .map(|(keyword, value)| match Operator::parse(keyword) {
            Some(Operator::Eq) => format!("equals {value}"),
            Some(Operator::Ne) => format!("does not equal {value}"),
            Some(Operator::Gt) => format!("greater than {value}"),
            Some(Operator::Gte) => format!("at least {value}"),
            Some(Operator::Lt) => format!("less than {value}"),
            Some(Operator::Lte) => format!("at most {value}"),
            Some(Operator::Contains) => format!("contains {value}"),
            Some(Operator::Exists) => {
                if truthy(value) {
                    "exists".to_string()
                } else {
                    "does not exist".to_string()
                }
            }
            None => format!("{keyword} {value} (unknown operator)"),
        })
        .collect();
    parts.join(" and ")
}
