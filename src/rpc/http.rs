//! JSON-RPC 2.0 over HTTP transport for registry endpoints.
//!
//! Connecting builds one `reqwest` client for the endpoint and, when
//! configured, sends a `GET` to prove it is reachable. Any HTTP answer
//! counts, including `405 Method Not Allowed` from servers that only take
//! `POST`; only a transport failure fails the connect. Calls POST a JSON-RPC
//! request and classify the reply:
//!
//! - an `error` member is a remote fault (its `data` is the fault detail)
//! - a non-success status without an `error` member is a transport failure
//! - otherwise the `result` member (or `null`) is the payload

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::rpc::{CallFailure, Connector, RemoteClient};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Builds [`HttpRpcClient`]s.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: HttpConfig,
}

impl HttpConnector {
    /// Create a connector with the given transport settings.
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    type Client = HttpRpcClient;

    async fn connect(&self, endpoint: &str) -> Result<HttpRpcClient> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::Configuration(format!("invalid endpoint {endpoint}: {e}")))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(self.config.connect_timeout_ms))
            .user_agent(self.config.user_agent.as_str())
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Transport(format!("HTTP client build failed: {e}")))?;

        if self.config.check_reachability {
            let response = http
                .get(url.clone())
                .send()
                .await
                .map_err(|e| Error::Transport(format!("{url}: {}", describe_error(&e))))?;
            debug!("Endpoint {url} reachable (HTTP {})", response.status());
        }

        Ok(HttpRpcClient {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }
}

/// A connected JSON-RPC endpoint. Immutable after construction apart from
/// the request id counter.
#[derive(Debug)]
pub struct HttpRpcClient {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// The endpoint this client talks to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RemoteClient for HttpRpcClient {
    async fn call(&self, operation: &str, args: Value) -> std::result::Result<Value, CallFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": operation,
            "params": args,
        });

        let response = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| CallFailure::Transport(describe_error(&e)))?;

        let status = response.status();
        let body = match response.json::<Value>().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(CallFailure::Transport(format!("HTTP {status}")));
            }
            Err(e) => {
                return Err(CallFailure::Transport(format!(
                    "undecodable response: {}",
                    describe_error(&e)
                )));
            }
        };

        parse_envelope(status, body)
    }
}

/// Classify a decoded JSON-RPC reply.
fn parse_envelope(status: StatusCode, mut body: Value) -> std::result::Result<Value, CallFailure> {
    match body.get_mut("error").map(Value::take) {
        Some(Value::Null) | None => {}
        Some(mut error) => {
            let message = match error.get("message") {
                Some(Value::String(m)) => m.clone(),
                _ => format!("remote fault (HTTP {status})"),
            };
            let detail = error.get_mut("data").map(Value::take).filter(|d| !d.is_null());
            return Err(CallFailure::Fault { message, detail });
        }
    }

    if !status.is_success() {
        return Err(CallFailure::Transport(format!("HTTP {status}")));
    }

    Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

/// Describe a transport error without echoing request internals.
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        "connection refused or unreachable".to_string()
    } else if error.is_timeout() {
        "connection timed out".to_string()
    } else if error.is_decode() {
        "response decode error".to_string()
    } else if error.is_body() {
        "response body error".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else {
        "network error".to_string()
    }
}
