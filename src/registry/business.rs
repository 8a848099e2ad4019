//! Business registry client for VAT identity checks.
//!
//! Queries the cross-border VAT registry with the `checkVatApprox`
//! operation. When a requester identity is configured it is sent along so
//! the registry issues a consultation number (`requestIdentifier`).

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::registry::types::VerificationResult;
use crate::registry::validator::validate_verification;
use crate::registry::IdentityProvider;
use crate::rpc::{invoke, ConnectionCache, Connector};
use crate::subject::VerificationSubject;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Provider name used in cache and lock keys.
pub const PROVIDER_NAME: &str = "vies";

/// Remote operation that performs an identity check.
pub const CHECK_OPERATION: &str = "checkVatApprox";

/// Checks VAT identities against the business registry.
pub struct BusinessRegistryClient<K: Connector> {
    connections: Arc<ConnectionCache<K>>,
    endpoint: String,
    timeout: Duration,
    requester: Option<VerificationSubject>,
}

impl<K: Connector> BusinessRegistryClient<K> {
    /// Create a client for the endpoint named in `config`.
    ///
    /// No connection is made until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if the
    /// endpoint is missing or the requester identity is malformed.
    pub fn new(connections: Arc<ConnectionCache<K>>, config: &ProviderConfig) -> Result<Self> {
        let endpoint = config.require_endpoint("business")?.to_string();
        let requester = config.requester("business")?;

        info!(
            "Business registry client configured (endpoint={endpoint}, timeout={}ms, requester={})",
            config.timeout_ms,
            requester.as_ref().map_or_else(|| "none".to_string(), ToString::to_string)
        );

        Ok(Self {
            connections,
            endpoint,
            timeout: config.timeout(),
            requester,
        })
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_args(&self, subject: &VerificationSubject) -> Value {
        let mut args = Map::new();
        args.insert("countryCode".to_string(), json!(subject.country_code()));
        args.insert("vatNumber".to_string(), json!(subject.local_id()));
        if let Some(requester) = &self.requester {
            args.insert(
                "requesterMemberStateCode".to_string(),
                json!(requester.country_code()),
            );
            args.insert("requesterNumber".to_string(), json!(requester.local_id()));
        }
        Value::Object(args)
    }
}

#[async_trait]
impl<K: Connector> IdentityProvider for BusinessRegistryClient<K> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn verify(&self, subject: &VerificationSubject) -> Result<VerificationResult> {
        debug!("Querying business registry for {subject}");

        let client = self.connections.get_client(&self.endpoint).await?;
        let payload = invoke(
            client.as_ref(),
            CHECK_OPERATION,
            self.request_args(subject),
            self.timeout,
        )
        .await?;
        let result = validate_verification(payload)?;

        debug!("Business registry answered {subject}: valid={}", result.valid);
        Ok(result)
    }
}
