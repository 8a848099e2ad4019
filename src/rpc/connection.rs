//! Single-flight cache of remote client handles, one per endpoint URL.
//!
//! The first caller for an endpoint starts the connection and parks the
//! *pending* future in the cache; concurrent callers await that same future.
//! A successful client is kept for the lifetime of the cache. A failed
//! initialization is evicted before the error is returned, so the next call
//! starts a fresh attempt instead of replaying the failure.
//!
//! Only initialization failures evict. A client whose later calls fail stays
//! cached; see [`ConnectionCache::invalidate`] for explicit eviction.

use crate::error::Result;
use crate::event::{emit, GatewayEvent, GatewayEventsSender};
use crate::rpc::Connector;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type PendingClient<C> = Shared<BoxFuture<'static, Result<Arc<C>>>>;

enum Slot<C> {
    /// Initialization in flight. `generation` identifies this attempt so a
    /// finished attempt never clobbers a newer one.
    Pending {
        generation: u64,
        future: PendingClient<C>,
    },
    Ready(Arc<C>),
}

/// Memoizes one shared client handle per endpoint.
pub struct ConnectionCache<K: Connector> {
    connector: Arc<K>,
    slots: Mutex<HashMap<String, Slot<K::Client>>>,
    next_generation: AtomicU64,
    events: Option<GatewayEventsSender>,
}

impl<K: Connector> ConnectionCache<K> {
    /// Create an empty cache backed by `connector`.
    #[must_use]
    pub fn new(connector: K) -> Self {
        Self {
            connector: Arc::new(connector),
            slots: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            events: None,
        }
    }

    /// Attach an event sender for connection lifecycle events.
    #[must_use]
    pub fn with_events(mut self, events: GatewayEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Get the client for `endpoint`, connecting on first use.
    ///
    /// # Errors
    ///
    /// Returns the initialization error. Every caller that joined the same
    /// attempt observes the same error, and the slot is cleared.
    pub async fn get_client(&self, endpoint: &str) -> Result<Arc<K::Client>> {
        let (generation, future) = {
            let mut slots = self.slots.lock();
            match slots.get(endpoint) {
                Some(Slot::Ready(client)) => return Ok(Arc::clone(client)),
                Some(Slot::Pending { generation, future }) => {
                    debug!("Joining in-flight connection to {endpoint}");
                    (*generation, future.clone())
                }
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let future = self.start_connect(endpoint);
                    slots.insert(
                        endpoint.to_string(),
                        Slot::Pending {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (generation, future)
                }
            }
        };

        let outcome = future.await;

        let mut slots = self.slots.lock();
        let current = matches!(
            slots.get(endpoint),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );

        match outcome {
            Ok(client) => {
                if current {
                    slots.insert(endpoint.to_string(), Slot::Ready(Arc::clone(&client)));
                    info!("Connected to registry endpoint {endpoint}");
                    emit(
                        self.events.as_ref(),
                        GatewayEvent::ConnectionEstablished {
                            endpoint: endpoint.to_string(),
                        },
                    );
                }
                Ok(client)
            }
            Err(e) => {
                if current {
                    slots.remove(endpoint);
                    warn!("Connection to {endpoint} failed, slot cleared: {e}");
                    emit(
                        self.events.as_ref(),
                        GatewayEvent::ConnectionFailed {
                            endpoint: endpoint.to_string(),
                            message: e.to_string(),
                        },
                    );
                }
                Err(e)
            }
        }
    }

    /// Drop the cached client (or pending attempt) for `endpoint`.
    ///
    /// Returns `true` if a slot was removed.
    pub fn invalidate(&self, endpoint: &str) -> bool {
        let removed = self.slots.lock().remove(endpoint).is_some();
        if removed {
            debug!("Invalidated connection to {endpoint}");
        }
        removed
    }

    /// Whether a ready client is cached for `endpoint`.
    #[must_use]
    pub fn is_ready(&self, endpoint: &str) -> bool {
        matches!(self.slots.lock().get(endpoint), Some(Slot::Ready(_)))
    }

    /// Number of endpoints with a ready or pending slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no endpoint has a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    fn start_connect(&self, endpoint: &str) -> PendingClient<K::Client> {
        let connector = Arc::clone(&self.connector);
        let endpoint = endpoint.to_string();
        debug!("Starting connection to {endpoint}");
        async move { connector.connect(&endpoint).await.map(Arc::new) }
            .boxed()
            .shared()
    }
}
