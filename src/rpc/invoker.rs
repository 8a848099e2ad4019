//! Timeout-bounded invocation of a single remote operation.

use crate::error::{Error, Result};
use crate::rpc::{CallFailure, RemoteClient};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Keys that carry a readable message inside structured fault detail.
const FAULT_MESSAGE_KEYS: [&str; 4] = ["faultstring", "message", "reason", "description"];

/// Execute `operation` on `client` under a wall-clock `timeout`.
///
/// Exactly one attempt is made.
///
/// # Errors
///
/// - [`Error::Timeout`] if the call does not finish in time
/// - [`Error::RemoteFault`] if the remote explicitly reports a fault
/// - [`Error::Transport`] for any transport-level failure
pub async fn invoke<C>(client: &C, operation: &str, args: Value, timeout: Duration) -> Result<Value>
where
    C: RemoteClient + ?Sized,
{
    debug!("Invoking {operation} (timeout={}ms)", timeout.as_millis());

    match tokio::time::timeout(timeout, client.call(operation, args)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(CallFailure::Fault { message, detail })) => {
            let message = detail.as_ref().and_then(fault_message).unwrap_or(message);
            warn!("Remote fault from {operation}: {message}");
            Err(Error::RemoteFault { message })
        }
        Ok(Err(CallFailure::Transport(message))) => {
            warn!("Transport failure invoking {operation}: {message}");
            Err(Error::Transport(message))
        }
        Err(_) => {
            warn!("{operation} timed out");
            Err(Error::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}

/// Pull a human-readable message out of structured fault detail.
fn fault_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => {
            let direct = FAULT_MESSAGE_KEYS.iter().find_map(|key| match map.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            });
            direct.or_else(|| map.get("fault").and_then(fault_message))
        }
        _ => None,
    }
}
