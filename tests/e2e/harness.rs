//! Test harness with scripted registries.
//!
//! Two flavours of registry are provided:
//! - [`ScriptedConnector`]: an in-process transport that answers by
//!   operation name, records every call and can be told to refuse
//!   connections or stall
//! - [`RegistryMock`]: a `mockito` server answering JSON-RPC over HTTP, for
//!   driving the real HTTP transport

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use mockito::{Matcher, Mock, Server, ServerGuard};
use parking_lot::Mutex;
use registry_gateway::rpc::{CallFailure, Connector, RemoteClient};
use registry_gateway::{Error, Gateway, GatewayBuilder, GatewayConfig, ProviderConfig, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Business registry endpoint used by scripted gateways.
pub const BUSINESS_ENDPOINT: &str = "https://vies.test/rpc";

/// Reliability registry endpoint used by scripted gateways.
pub const RELIABILITY_ENDPOINT: &str = "https://adis.test/rpc";

/// Scripted answer for one operation.
#[derive(Clone)]
pub enum Answer {
    /// Respond with this payload.
    Payload(Value),
    /// Fail the call.
    Fail(CallFailure),
    /// Never respond.
    Stall,
}

#[derive(Default)]
struct Script {
    answers: Mutex<HashMap<String, Answer>>,
    calls: Mutex<Vec<(String, String, Value)>>,
    connects: AtomicUsize,
    refuse: Mutex<bool>,
    latency: Mutex<Duration>,
}

/// Handle for scripting and inspecting a [`ScriptedConnector`].
#[derive(Clone, Default)]
pub struct Registries {
    script: Arc<Script>,
}

impl Registries {
    /// Answer `operation` with `answer` from now on.
    pub fn answer(&self, operation: &str, answer: Answer) {
        self.script
            .answers
            .lock()
            .insert(operation.to_string(), answer);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.script.latency.lock() = latency;
    }

    /// Refuse (or accept) new connections.
    pub fn refuse_connections(&self, refuse: bool) {
        *self.script.refuse.lock() = refuse;
    }

    /// Number of calls made to `operation`.
    pub fn calls_to(&self, operation: &str) -> usize {
        self.script
            .calls
            .lock()
            .iter()
            .filter(|(_, op, _)| op == operation)
            .count()
    }

    /// Arguments of every call to `operation`, in order.
    pub fn args_of(&self, operation: &str) -> Vec<Value> {
        self.script
            .calls
            .lock()
            .iter()
            .filter(|(_, op, _)| op == operation)
            .map(|(_, _, args)| args.clone())
            .collect()
    }

    /// Number of connection attempts across all endpoints.
    pub fn connects(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }

    /// A connector driven by this script.
    pub fn connector(&self) -> ScriptedConnector {
        ScriptedConnector {
            script: Arc::clone(&self.script),
        }
    }

    /// Build a gateway over this script with default settings.
    pub fn gateway(&self) -> Gateway<ScriptedConnector> {
        self.gateway_with(scripted_config())
            .expect("scripted gateway builds")
    }

    /// Build a gateway over this script with `config`.
    pub fn gateway_with(&self, config: GatewayConfig) -> Result<Gateway<ScriptedConnector>> {
        GatewayBuilder::new(config)
            .with_connector(self.connector())
            .build()
    }
}

/// Configuration pointing at the scripted endpoints.
pub fn scripted_config() -> GatewayConfig {
    let mut config = GatewayConfig {
        business: ProviderConfig::with_endpoint(BUSINESS_ENDPOINT),
        reliability: ProviderConfig::with_endpoint(RELIABILITY_ENDPOINT),
        ..GatewayConfig::default()
    };
    config.lock.backoff_base_ms = 1;
    config.lock.backoff_max_ms = 5;
    config
}

/// In-process transport answering from a [`Registries`] script.
pub struct ScriptedConnector {
    script: Arc<Script>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Client = ScriptedClient;

    async fn connect(&self, endpoint: &str) -> Result<ScriptedClient> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        if *self.script.refuse.lock() {
            return Err(Error::Transport(format!("{endpoint}: connection refused")));
        }
        Ok(ScriptedClient {
            endpoint: endpoint.to_string(),
            script: Arc::clone(&self.script),
        })
    }
}

/// Client produced by [`ScriptedConnector`].
pub struct ScriptedClient {
    endpoint: String,
    script: Arc<Script>,
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn call(&self, operation: &str, args: Value) -> std::result::Result<Value, CallFailure> {
        self.script
            .calls
            .lock()
            .push((self.endpoint.clone(), operation.to_string(), args));

        let latency = *self.script.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let answer = self.script.answers.lock().get(operation).cloned();
        match answer {
            Some(Answer::Payload(value)) => Ok(value),
            Some(Answer::Fail(failure)) => Err(failure),
            Some(Answer::Stall) => std::future::pending().await,
            None => Err(CallFailure::Fault {
                message: format!("unknown operation {operation}"),
                detail: None,
            }),
        }
    }
}

/// JSON-RPC over HTTP registry built on `mockito`.
///
/// Requests are matched on the method name and, optionally, a regex over the
/// serialized params that follow it.
pub struct RegistryMock {
    server: ServerGuard,
}

impl RegistryMock {
    /// Start a fresh mock server.
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    /// JSON-RPC endpoint URL of this server.
    pub fn url(&self) -> String {
        format!("{}/rpc", self.server.url())
    }

    /// Answer `GET` on the endpoint with `status`, once.
    pub async fn mock_get(&mut self, status: usize) -> Mock {
        self.server
            .mock("GET", "/rpc")
            .with_status(status)
            .expect(1)
            .create_async()
            .await
    }

    /// Answer `method` calls whose params match `params` with `result`,
    /// expecting exactly `hits` of them.
    pub async fn mock_result(&mut self, method: &str, params: &str, result: Value, hits: usize) -> Mock {
        self.mock_post(method, params, 200, json!({"result": result}), hits)
            .await
    }

    /// Answer `method` calls whose params match `params` with a JSON-RPC
    /// error object, expecting exactly `hits` of them.
    pub async fn mock_error(
        &mut self,
        method: &str,
        params: &str,
        status: usize,
        error: Value,
        hits: usize,
    ) -> Mock {
        self.mock_post(method, params, status, json!({"error": error}), hits)
            .await
    }

    async fn mock_post(
        &mut self,
        method: &str,
        params: &str,
        status: usize,
        mut body: Value,
        hits: usize,
    ) -> Mock {
        body["jsonrpc"] = json!("2.0");
        body["id"] = json!(1);
        self.server
            .mock("POST", "/rpc")
            .match_body(Matcher::Regex(format!(
                r#""method"\s*:\s*"{method}".*{params}"#
            )))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }
}
