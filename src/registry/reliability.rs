//! Reliability registry client for taxpayer status lookups.
//!
//! Lookups here are not cached: every call goes to the registry, bounded by
//! the provider timeout, and the reply is schema-checked before it is
//! returned.

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::registry::types::StatusResult;
use crate::registry::validator::validate_status;
use crate::rpc::{invoke, ConnectionCache, Connector};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Remote operation that returns a payer's status.
pub const STATUS_OPERATION: &str = "getStatus";

/// Country prefix accepted (and stripped) in front of a local identifier.
const LOCAL_PREFIX: &str = "CZ";

/// Looks up taxpayer reliability.
pub struct ReliabilityRegistryClient<K: Connector> {
    connections: Arc<ConnectionCache<K>>,
    endpoint: String,
    timeout: Duration,
}

impl<K: Connector> ReliabilityRegistryClient<K> {
    /// Create a client for the endpoint named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the endpoint is missing.
    pub fn new(connections: Arc<ConnectionCache<K>>, config: &ProviderConfig) -> Result<Self> {
        let endpoint = config.require_endpoint("reliability")?.to_string();
        info!(
            "Reliability registry client configured (endpoint={endpoint}, timeout={}ms)",
            config.timeout_ms
        );
        Ok(Self {
            connections,
            endpoint,
            timeout: config.timeout(),
        })
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the reliability status of `local_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::InputValidation`] if `local_id` is not 8-10 digits
    /// - any invocation or validation error, unchanged
    pub async fn status(&self, local_id: &str) -> Result<StatusResult> {
        let local_id = normalize_local_id(local_id)?;
        debug!("Querying reliability registry for {local_id}");

        let client = self.connections.get_client(&self.endpoint).await?;
        let payload = invoke(
            client.as_ref(),
            STATUS_OPERATION,
            json!({ "localIds": [local_id] }),
            self.timeout,
        )
        .await?;

        validate_status(&local_id, payload)
    }
}

/// Trim, drop an optional country prefix, and require 8-10 digits.
fn normalize_local_id(input: &str) -> Result<String> {
    let trimmed = input.trim().to_uppercase();
    let digits = trimmed.strip_prefix(LOCAL_PREFIX).unwrap_or(&trimmed);
    if (8..=10).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(digits.to_string())
    } else {
        Err(Error::InputValidation(format!(
            "local identifier must be 8-10 digits: {input:?}"
        )))
    }
}
