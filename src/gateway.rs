//! Gateway facade wiring configuration, transport, store and providers.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::event::{create_event_channel, GatewayEventsChannel, GatewayEventsSender};
use crate::registry::{
    BusinessRegistryClient, ReliabilityRegistryClient, StatusResult, VerificationResult,
};
use crate::rpc::{ConnectionCache, Connector, HttpConnector};
use crate::store::{CacheLockStore, MemoryStore};
use crate::verification::{CachePolicy, ServiceStats, VerificationCacheService};
use std::sync::Arc;
use tracing::info;

/// Builder for constructing a gateway.
pub struct GatewayBuilder<K: Connector = HttpConnector> {
    config: GatewayConfig,
    connector: K,
    store: Option<Arc<dyn CacheLockStore>>,
}

impl GatewayBuilder<HttpConnector> {
    /// Create a new builder that talks HTTP to the configured registries.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let connector = HttpConnector::new(config.http.clone());
        Self {
            config,
            connector,
            store: None,
        }
    }
}

impl<K: Connector> GatewayBuilder<K> {
    /// Use a different transport.
    #[must_use]
    pub fn with_connector<C: Connector>(self, connector: C) -> GatewayBuilder<C> {
        GatewayBuilder {
            config: self.config,
            connector,
            store: self.store,
        }
    }

    /// Use a shared store instead of a private in-process one.
    ///
    /// Gateways built over the same store coordinate their locks and share
    /// cached results.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CacheLockStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and assemble the gateway.
    ///
    /// No connection is opened here; each registry is contacted on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if the
    /// configuration is invalid.
    pub fn build(self) -> Result<Gateway<K>> {
        self.config.validate()?;

        let (events_tx, events_rx) = create_event_channel();

        let connections =
            Arc::new(ConnectionCache::new(self.connector).with_events(events_tx.clone()));
        let store: Arc<dyn CacheLockStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::with_capacity(self.config.cache.capacity)),
        };

        let business = BusinessRegistryClient::new(Arc::clone(&connections), &self.config.business)?;
        let reliability =
            ReliabilityRegistryClient::new(Arc::clone(&connections), &self.config.reliability)?;
        let verification = VerificationCacheService::new(
            business,
            store,
            self.config.cache_policy(),
            self.config.lock_options(),
        )
        .with_events(events_tx.clone());

        info!("Gateway ready");

        Ok(Gateway {
            connections,
            verification,
            reliability,
            events_tx,
            events_rx: Some(events_rx),
        })
    }
}

/// A configured gateway.
pub struct Gateway<K: Connector = HttpConnector> {
    connections: Arc<ConnectionCache<K>>,
    verification: VerificationCacheService<BusinessRegistryClient<K>, dyn CacheLockStore>,
    reliability: ReliabilityRegistryClient<K>,
    events_tx: GatewayEventsSender,
    events_rx: Option<GatewayEventsChannel>,
}

impl<K: Connector> Gateway<K> {
    /// Verify a business identity given as country code and local identifier.
    ///
    /// Results are cached; concurrent lookups for the same identity share one
    /// registry call.
    ///
    /// # Errors
    ///
    /// - [`Error::InputValidation`](crate::Error::InputValidation) for a
    ///   malformed identity, before any I/O
    /// - registry, store or lock errors, unchanged
    pub async fn check_identity(&self, country_code: &str, local_id: &str) -> Result<VerificationResult> {
        self.verification.check_identity(country_code, local_id).await
    }

    /// Verify a business identity given as one VAT string.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check_identity`].
    pub async fn check_vat(&self, vat: &str) -> Result<VerificationResult> {
        self.verification.check_vat(vat).await
    }

    /// Fetch the reliability status of a local taxpayer identifier.
    ///
    /// Not cached.
    ///
    /// # Errors
    ///
    /// - [`Error::InputValidation`](crate::Error::InputValidation) if the
    ///   identifier is not 8-10 digits
    /// - registry errors, unchanged
    pub async fn reliability_status(&self, local_id: &str) -> Result<StatusResult> {
        self.reliability.status(local_id).await
    }

    /// Get verification statistics.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        self.verification.stats()
    }

    /// Cache lifetimes in effect.
    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        self.verification.policy()
    }

    /// The shared connection cache.
    #[must_use]
    pub fn connections(&self) -> &ConnectionCache<K> {
        &self.connections
    }

    /// Get a receiver for gateway events.
    ///
    /// Returns `None` after the first call.
    pub fn events(&mut self) -> Option<GatewayEventsChannel> {
        self.events_rx.take()
    }

    /// Subscribe to gateway events.
    #[must_use]
    pub fn subscribe_events(&self) -> GatewayEventsChannel {
        self.events_tx.subscribe()
    }
}
