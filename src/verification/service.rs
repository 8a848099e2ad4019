//! The verification cache service.

use crate::error::{Error, Result};
use crate::event::{emit, GatewayEvent, GatewayEventsSender};
use crate::registry::{IdentityProvider, VerificationResult};
use crate::store::{with_lock, CacheLockStore, LockOptions};
use crate::subject::VerificationSubject;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache lifetimes by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Lifetime of `valid=true` results.
    pub positive_ttl: Duration,
    /// Lifetime of negative or inconclusive results.
    pub negative_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            positive_ttl: Duration::from_secs(24 * 3600),
            negative_ttl: Duration::from_secs(3600),
        }
    }
}

impl CachePolicy {
    /// TTL to store `result` with.
    #[must_use]
    pub fn ttl_for(&self, result: &VerificationResult) -> Duration {
        if result.valid {
            self.positive_ttl
        } else {
            self.negative_ttl
        }
    }
}

/// Service statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct ServiceStats {
    /// Lookups answered by the first cache read.
    pub cache_hits: u64,
    /// Lookups that missed the first cache read.
    pub cache_misses: u64,
    /// Misses answered by the re-check after waiting for the lock.
    pub coalesced: u64,
    /// Outbound provider calls.
    pub remote_calls: u64,
    /// Outbound provider calls that failed.
    pub remote_failures: u64,
    /// Fresh results that could not be written to the store.
    pub cache_write_failures: u64,
}

impl ServiceStats {
    /// Percentage of lookups that made no outbound call.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            ((self.cache_hits + self.coalesced) as f64 / total as f64) * 100.0
        }
    }
}

/// Cache-aside front for an [`IdentityProvider`].
///
/// At most one outbound call per subject is in flight at a time for callers
/// sharing the same store.
pub struct VerificationCacheService<P, S: ?Sized> {
    provider: P,
    store: Arc<S>,
    policy: CachePolicy,
    lock: LockOptions,
    stats: Mutex<ServiceStats>,
    events: Option<GatewayEventsSender>,
}

impl<P, S> VerificationCacheService<P, S>
where
    P: IdentityProvider,
    S: CacheLockStore + ?Sized + 'static,
{
    /// Create a service over `provider` backed by `store`.
    #[must_use]
    pub fn new(provider: P, store: Arc<S>, policy: CachePolicy, lock: LockOptions) -> Self {
        info!(
            "Verification cache initialized (provider={}, positive_ttl={}s, negative_ttl={}s)",
            provider.name(),
            policy.positive_ttl.as_secs(),
            policy.negative_ttl.as_secs()
        );
        Self {
            provider,
            store,
            policy,
            lock,
            stats: Mutex::new(ServiceStats::default()),
            events: None,
        }
    }

    /// Attach an event sender for lookup events.
    #[must_use]
    pub fn with_events(mut self, events: GatewayEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Verify an identity given as country code and local identifier.
    ///
    /// # Errors
    ///
    /// - [`Error::InputValidation`](crate::Error::InputValidation) for a
    ///   malformed identity, before any I/O
    /// - any provider, store or lock error, unchanged
    pub async fn check_identity(&self, country_code: &str, local_id: &str) -> Result<VerificationResult> {
        let subject = VerificationSubject::new(country_code, local_id)?;
        self.lookup(&subject).await
    }

    /// Verify an identity given as one VAT string such as `"CZ12345678"`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check_identity`].
    pub async fn check_vat(&self, vat: &str) -> Result<VerificationResult> {
        let subject = VerificationSubject::parse(vat)?;
        self.lookup(&subject).await
    }

    /// Look up an already parsed subject.
    ///
    /// # Errors
    ///
    /// Any provider, store or lock error, unchanged.
    pub async fn lookup(&self, subject: &VerificationSubject) -> Result<VerificationResult> {
        let provider = self.provider.name();
        let key = subject.cache_key(provider);

        // Fast path
        if let Some(cached) = self.read_cached(&key).await? {
            debug!("Cache hit for {key}");
            self.stats.lock().cache_hits += 1;
            emit(self.events.as_ref(), GatewayEvent::CacheHit { key });
            return Ok(cached);
        }

        debug!("Cache miss for {key}");
        self.stats.lock().cache_misses += 1;
        emit(self.events.as_ref(), GatewayEvent::CacheMiss { key: key.clone() });

        let lock_key = subject.lock_key(provider);
        with_lock(&self.store, &lock_key, &self.lock, || async {
            if let Some(cached) = self.read_cached(&key).await? {
                debug!("{key} was filled while waiting for the lock");
                self.stats.lock().coalesced += 1;
                return Ok(cached);
            }

            let result = self.fetch(subject).await?;
            self.write_cached(&key, &result).await;
            Ok(result)
        })
        .await
    }

    /// Get current service statistics.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        self.stats.lock().clone()
    }

    /// The cache lifetimes in effect.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    async fn fetch(&self, subject: &VerificationSubject) -> Result<VerificationResult> {
        let provider = self.provider.name();
        self.stats.lock().remote_calls += 1;
        emit(
            self.events.as_ref(),
            GatewayEvent::RemoteLookup {
                provider: provider.to_string(),
                subject: subject.to_string(),
            },
        );

        match self.provider.verify(subject).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Lookup of {subject} at {provider} failed: {e}");
                self.stats.lock().remote_failures += 1;
                emit(
                    self.events.as_ref(),
                    GatewayEvent::LookupFailed {
                        provider: provider.to_string(),
                        subject: subject.to_string(),
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Read and decode a cache entry. An entry that no longer decodes is
    /// treated as a miss and overwritten by the next successful lookup.
    async fn read_cached(&self, key: &str) -> Result<Option<VerificationResult>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!("Ignoring undecodable cache entry {key}: {e}");
                Ok(None)
            }
        }
    }

    /// Store a fresh result. A failed write only costs a later cache miss:
    /// the caller still gets the result, and the failure is counted and
    /// reported as [`GatewayEvent::CacheWriteFailed`].
    async fn write_cached(&self, key: &str, result: &VerificationResult) {
        let ttl = self.policy.ttl_for(result);
        let written = match serde_json::to_string(result) {
            Ok(encoded) => self.store.set(key, encoded, ttl).await,
            Err(e) => Err(Error::Store(format!("cannot encode result: {e}"))),
        };
        match written {
            Ok(()) => debug!("Cached {key} for {}s (valid={})", ttl.as_secs(), result.valid),
            Err(e) => {
                warn!("Failed to cache {key}: {e}");
                self.stats.lock().cache_write_failures += 1;
                emit(
                    self.events.as_ref(),
                    GatewayEvent::CacheWriteFailed {
                        key: key.to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }
}
