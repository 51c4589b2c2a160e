//! # Collection Runner
//!
//! Executes a collection's requests strictly in declaration order,
//! threading one [`ExecutionContext`] through the run. Each completed
//! request binds its response into the context under the request's name,
//! which is what makes `{{login.response.body.token}}`-style chaining
//! work in later requests.
//!
//! Failures are isolated per request: a dispatch error is recorded on
//! that request's result and the run moves on. A failed request binds
//! nothing, so placeholders referencing it stay unresolved downstream.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assertions::{self, AssertionResult};
use crate::collection::{Collection, RequestSpec};
use crate::http::{HttpClient, PreparedRequest, ReqwestClient, ResponseRecord};
use crate::template::{interpolate, interpolate_deep, resolve_path};

/// Per-run options: the variable map seeding the context's `env` binding
/// and the base URL prepended to scheme-less request URLs.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub env: HashMap<String, String>,
    pub base_url: String,
}

/// Externally visible outcome of one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResult {
    pub name: String,
    pub passed: bool,
    pub assertions: Vec<AssertionResult>,
    pub error: Option<String>,
    pub response: Option<ResponseRecord>,
}

/// Structural configuration errors, surfaced before any dispatch begins.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Request #{index} has an empty name; the name is the chaining key")]
    EmptyRequestName { index: usize },
    #[error("Duplicate request name `{name}`; names must be unique within a collection")]
    DuplicateRequestName { name: String },
}

/// The accumulating binding set available to interpolation during one
/// run: `env` plus one `{ response }` binding per completed request.
/// Created fresh per run, owned by the runner, grows monotonically.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    root: Value,
}

impl ExecutionContext {
    pub fn new(env: &HashMap<String, String>) -> Self {
        let env_object: Map<String, Value> = env
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        let mut root = Map::new();
        root.insert("env".to_string(), Value::Object(env_object));
        Self {
            root: Value::Object(root),
        }
    }

    /// Build a context over an arbitrary binding tree. Useful for callers
    /// that interpolate outside a collection run.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Bind a completed request's response under its name.
    pub fn bind_response(&mut self, name: &str, record: &ResponseRecord) {
        let record_value = serde_json::to_value(record).unwrap_or(Value::Null);
        let mut binding = Map::new();
        binding.insert("response".to_string(), record_value);
        if let Some(object) = self.root.as_object_mut() {
            object.insert(name.to_string(), Value::Object(binding));
        }
    }

    /// Resolve a dotted path against the full binding tree.
    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.root, path)
    }

    /// Look up an `env.`-referenced variable: the run's env mapping first,
    /// the process environment second.
    pub fn env_var(&self, name: &str) -> Option<String> {
        let bound = self
            .root
            .get("env")
            .and_then(|env| env.get(name))
            .and_then(Value::as_str);
        match bound {
            Some(value) => Some(value.to_string()),
            None => std::env::var(name).ok(),
        }
    }
}

/// Run a collection with the bundled reqwest transport.
pub async fn run_collection(
    collection: &Collection,
    options: &RunOptions,
) -> Result<Vec<RequestResult>, RunnerError> {
    run_collection_with(collection, options, &ReqwestClient::new()).await
}

/// Run a collection against an explicit transport. Returns one
/// [`RequestResult`] per request, in declaration order, regardless of
/// individual outcomes.
pub async fn run_collection_with(
    collection: &Collection,
    options: &RunOptions,
    client: &dyn HttpClient,
) -> Result<Vec<RequestResult>, RunnerError> {
    validate(collection)?;

    let mut context = ExecutionContext::new(&options.env);
    let mut results = Vec::with_capacity(collection.requests.len());

    for spec in &collection.requests {
        let request = prepare_request(spec, options, &context);
        debug!(name = %spec.name, method = %request.method, url = %request.url, "dispatching");

        let result = match client.send(&request).await {
            Ok(record) => {
                context.bind_response(&spec.name, &record);
                complete_request(spec, record)
            }
            Err(err) => {
                warn!(name = %spec.name, error = %err, "dispatch failed");
                RequestResult {
                    name: spec.name.clone(),
                    passed: false,
                    assertions: Vec::new(),
                    error: Some(err.to_string()),
                    response: None,
                }
            }
        };
        results.push(result);
    }

    Ok(results)
}

fn validate(collection: &Collection) -> Result<(), RunnerError> {
    let mut seen = HashSet::new();
    for (index, spec) in collection.requests.iter().enumerate() {
        if spec.name.trim().is_empty() {
            return Err(RunnerError::EmptyRequestName { index });
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(RunnerError::DuplicateRequestName {
                name: spec.name.clone(),
            });
        }
    }
    Ok(())
}

fn prepare_request(
    spec: &RequestSpec,
    options: &RunOptions,
    context: &ExecutionContext,
) -> PreparedRequest {
    let url = interpolate(&spec.url, context);
    // Scheme-less URLs get the base URL prepended, and the combined string
    // is interpolated again so placeholders may live in either part.
    let url = if url.starts_with("http") {
        url
    } else {
        interpolate(&format!("{}{}", options.base_url, url), context)
    };

    let headers = spec
        .headers
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .map(|(name, value)| (name.clone(), interpolate(value, context)))
                .collect()
        })
        .unwrap_or_default();

    PreparedRequest {
        method: spec.method.clone().unwrap_or_else(|| "GET".to_string()),
        url,
        headers,
        json: spec.json.as_ref().map(|value| interpolate_deep(value, context)),
        body: spec.body.as_ref().map(|body| interpolate(body, context)),
    }
}

fn complete_request(spec: &RequestSpec, record: ResponseRecord) -> RequestResult {
    match &spec.assert {
        Some(assertion_map) => {
            let assertion_results = assertions::evaluate(&record, assertion_map);
            let passed = assertion_results.iter().all(|result| result.passed);
            RequestResult {
                name: spec.name.clone(),
                passed,
                assertions: assertion_results,
                error: None,
                response: Some(record),
            }
        }
        None => RequestResult {
            name: spec.name.clone(),
            passed: (200..400).contains(&record.status),
            assertions: Vec::new(),
            error: None,
            response: Some(record),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Test transport: pops scripted outcomes and records every
    /// dispatched request for inspection.
    struct ScriptedClient {
        outcomes: Mutex<VecDeque<Result<ResponseRecord, RequestError>>>,
        dispatched: Mutex<Vec<PreparedRequest>>,
    }

    impl ScriptedClient {
        fn new(outcomes: Vec<Result<ResponseRecord, RequestError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                dispatched: Mutex::new(Vec::new()),
            }
        }

        fn dispatched(&self) -> Vec<PreparedRequest> {
            self.dispatched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn send(&self, request: &PreparedRequest) -> Result<ResponseRecord, RequestError> {
            self.dispatched.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RequestError::invalid("no scripted outcome")))
        }
    }

    fn response(status: u16, body: Value) -> ResponseRecord {
        ResponseRecord {
            status,
            status_text: "OK".to_string(),
            headers: HashMap::new(),
            raw_body: body.to_string(),
            body,
            response_time: 10,
            size: 0,
            url: "http://example.com/".to_string(),
            method: "GET".to_string(),
        }
    }

    fn request(name: &str, url: &str) -> RequestSpec {
        RequestSpec {
            name: name.to_string(),
            method: None,
            url: url.to_string(),
            headers: None,
            json: None,
            body: None,
            assert: None,
        }
    }

    fn collection(requests: Vec<RequestSpec>) -> Collection {
        Collection {
            name: "test".to_string(),
            base_url: String::new(),
            requests,
        }
    }

    #[tokio::test]
    async fn test_chains_response_data_into_later_requests() {
        let client = ScriptedClient::new(vec![
            Ok(response(200, json!({"token": "abc123"}))),
            Ok(response(200, json!({"name": "Alice"}))),
        ]);

        let mut profile = request("get-profile", "http://api.local/profile");
        profile.headers = Some(
            [(
                "Authorization".to_string(),
                "Bearer {{login.response.body.token}}".to_string(),
            )]
            .into_iter()
            .collect(),
        );

        let specs = vec![request("login", "http://api.local/login"), profile];
        let results = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap();

        assert!(results.iter().all(|result| result.passed));
        let dispatched = client.dispatched();
        assert_eq!(
            dispatched[1].headers.get("Authorization").unwrap(),
            "Bearer abc123"
        );
    }

    #[tokio::test]
    async fn test_failed_request_is_isolated_and_binds_nothing() {
        let client = ScriptedClient::new(vec![
            Err(RequestError::invalid("dns failure")),
            Ok(response(200, json!({}))),
        ]);

        let mut second = request("second", "http://api.local/next");
        second.headers = Some(
            [(
                "X-Chain".to_string(),
                "id={{first.response.body.id}}".to_string(),
            )]
            .into_iter()
            .collect(),
        );

        let specs = vec![request("first", "http://api.local/dead"), second];
        let results = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert_eq!(results[0].error.as_deref(), Some("dns failure"));
        assert!(results[0].response.is_none());
        assert!(results[1].passed);

        // The broken chain stays visible as literal placeholder text.
        let dispatched = client.dispatched();
        assert_eq!(
            dispatched[1].headers.get("X-Chain").unwrap(),
            "id={{first.response.body.id}}"
        );
    }

    #[tokio::test]
    async fn test_results_follow_declaration_order() {
        let client = ScriptedClient::new(vec![
            Err(RequestError::invalid("boom")),
            Ok(response(500, Value::Null)),
            Ok(response(200, Value::Null)),
        ]);

        let specs = vec![
            request("a", "http://api.local/a"),
            request("b", "http://api.local/b"),
            request("c", "http://api.local/c"),
        ];
        let results = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap();

        let names: Vec<&str> = results.iter().map(|result| result.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(
            results.iter().map(|r| r.passed).collect::<Vec<_>>(),
            [false, false, true]
        );
    }

    #[tokio::test]
    async fn test_status_range_policy_without_assertions() {
        let client = ScriptedClient::new(vec![
            Ok(response(200, Value::Null)),
            Ok(response(301, Value::Null)),
            Ok(response(400, Value::Null)),
        ]);

        let specs = vec![
            request("ok", "http://api.local/1"),
            request("redirect", "http://api.local/2"),
            request("bad", "http://api.local/3"),
        ];
        let results = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap();

        assert!(results[0].passed);
        assert!(results[1].passed);
        assert!(!results[2].passed);
    }

    #[tokio::test]
    async fn test_assertions_decide_passed() {
        let client = ScriptedClient::new(vec![Ok(response(404, json!({"count": 42})))]);

        let mut spec = request("lookup", "http://api.local/lookup");
        spec.assert = Some(
            serde_json::from_value(json!({"status": 404, "body.count": {"gte": 42, "lte": 42}}))
                .unwrap(),
        );

        let results = run_collection_with(&collection(vec![spec]), &RunOptions::default(), &client)
            .await
            .unwrap();

        // 404 out of the success range still passes when assertions say so.
        assert!(results[0].passed);
        assert_eq!(results[0].assertions.len(), 2);
    }

    #[tokio::test]
    async fn test_base_url_prepended_and_interpolated() {
        let client = ScriptedClient::new(vec![Ok(response(200, Value::Null))]);

        let options = RunOptions {
            env: [("version".to_string(), "v2".to_string())]
                .into_iter()
                .collect(),
            base_url: "http://api.local/{{env.version}}".to_string(),
        };
        let specs = vec![request("ping", "/ping")];
        let _ = run_collection_with(&collection(specs), &options, &client)
            .await
            .unwrap();

        assert_eq!(client.dispatched()[0].url, "http://api.local/v2/ping");
    }

    #[tokio::test]
    async fn test_absolute_url_skips_base() {
        let client = ScriptedClient::new(vec![Ok(response(200, Value::Null))]);

        let options = RunOptions {
            env: HashMap::new(),
            base_url: "http://base.local".to_string(),
        };
        let specs = vec![request("ping", "https://other.local/ping")];
        let _ = run_collection_with(&collection(specs), &options, &client)
            .await
            .unwrap();

        assert_eq!(client.dispatched()[0].url, "https://other.local/ping");
    }

    #[tokio::test]
    async fn test_method_defaults_to_get() {
        let client = ScriptedClient::new(vec![Ok(response(200, Value::Null))]);
        let specs = vec![request("ping", "http://api.local/ping")];
        let _ = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap();
        assert_eq!(client.dispatched()[0].method, "GET");
    }

    #[tokio::test]
    async fn test_json_body_is_deep_interpolated() {
        let client = ScriptedClient::new(vec![Ok(response(200, Value::Null))]);

        let options = RunOptions {
            env: [("user".to_string(), "alice".to_string())]
                .into_iter()
                .collect(),
            base_url: String::new(),
        };
        let mut spec = request("create", "http://api.local/users");
        spec.method = Some("POST".to_string());
        spec.json = Some(json!({"username": "{{env.user}}", "active": true}));

        let _ = run_collection_with(&collection(vec![spec]), &options, &client)
            .await
            .unwrap();

        assert_eq!(
            client.dispatched()[0].json,
            Some(json!({"username": "alice", "active": true}))
        );
    }

    #[tokio::test]
    async fn test_duplicate_names_fail_fast() {
        let client = ScriptedClient::new(vec![]);
        let specs = vec![
            request("dup", "http://api.local/1"),
            request("dup", "http://api.local/2"),
        ];
        let err = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::DuplicateRequestName { name } if name == "dup"));
        // Fails before any dispatch.
        assert!(client.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_fails_fast() {
        let client = ScriptedClient::new(vec![]);
        let specs = vec![request("  ", "http://api.local/1")];
        let err = run_collection_with(&collection(specs), &RunOptions::default(), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::EmptyRequestName { index: 0 }));
    }

    #[test]
    fn test_context_binds_response_for_resolution() {
        let mut context = ExecutionContext::new(&HashMap::new());
        context.bind_response("login", &response(200, json!({"token": "abc"})));
        assert_eq!(
            context.get("login.response.body.token"),
            Some(&json!("abc"))
        );
        assert_eq!(context.get("login.response.status"), Some(&json!(200)));
    }
}
