use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use super::error::RequestError;
use super::response::ResponseRecord;

/// A fully interpolated request, ready for dispatch.
#[derive(Debug, Clone, Default)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub json: Option<Value>,
    pub body: Option<String>,
}

/// Transport capability consumed by the collection runner: send one
/// request, produce one normalized response or a typed failure.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseRecord, RequestError>;
}

/// The bundled reqwest-backed transport.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Build a client with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RequestError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|err| RequestError::invalid(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseRecord, RequestError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|err| {
            RequestError::invalid(format!("Invalid HTTP method `{}`: {err}", request.method))
        })?;
        let headers = build_headers(&request.headers)?;

        let mut builder = self
            .client
            .request(method.clone(), &request.url)
            .headers(headers);

        // JSON body takes precedence over a raw body when both are given.
        if let Some(json) = &request.json {
            builder = builder.json(json);
        } else if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(RequestError::from_reqwest)?;
        let elapsed = started.elapsed().as_millis() as u64;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("Unknown").to_string();

        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            response_headers.insert(
                name.as_str().to_ascii_lowercase(),
                value.to_str().unwrap_or_default().to_string(),
            );
        }

        let bytes = response.bytes().await.map_err(RequestError::from_reqwest)?;
        let raw_body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(
            method = %method,
            url = %request.url,
            status = status.as_u16(),
            elapsed_ms = elapsed,
            "request completed"
        );

        Ok(ResponseRecord {
            status: status.as_u16(),
            status_text,
            headers: response_headers,
            body: ResponseRecord::parse_body(&raw_body),
            size: bytes.len() as u64,
            raw_body,
            response_time: elapsed,
            url: request.url.clone(),
            method: method.to_string(),
        })
    }
}

fn build_headers(input: &IndexMap<String, String>) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| RequestError::invalid(format!("Invalid header name `{key}`: {err}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            RequestError::invalid(format!("Invalid header value for `{key}`: {err}"))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
