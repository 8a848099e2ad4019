//! Gateway event system.

use tokio::sync::broadcast;

/// Events emitted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A lookup was answered from the cache.
    CacheHit {
        /// Cache key.
        key: String,
    },

    /// A lookup missed the cache on its first read.
    CacheMiss {
        /// Cache key.
        key: String,
    },

    /// A fresh result could not be written to the store.
    CacheWriteFailed {
        /// Cache key.
        key: String,
        /// Error message.
        message: String,
    },

    /// An outbound registry call was made.
    RemoteLookup {
        /// Provider name.
        provider: String,
        /// Subject being verified.
        subject: String,
    },

    /// An outbound registry call failed.
    LookupFailed {
        /// Provider name.
        provider: String,
        /// Subject being verified.
        subject: String,
        /// Error message.
        message: String,
    },

    /// A client handle for an endpoint became ready.
    ConnectionEstablished {
        /// Endpoint URL.
        endpoint: String,
    },

    /// Client initialization for an endpoint failed and was evicted.
    ConnectionFailed {
        /// Endpoint URL.
        endpoint: String,
        /// Error message.
        message: String,
    },
}

/// Channel for receiving gateway events.
pub type GatewayEventsChannel = broadcast::Receiver<GatewayEvent>;

/// Sender for gateway events.
pub type GatewayEventsSender = broadcast::Sender<GatewayEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (GatewayEventsSender, GatewayEventsChannel) {
    broadcast::channel(256)
}

/// Send an event if a sender is attached. Having no subscribers is fine.
pub(crate) fn emit(sender: Option<&GatewayEventsSender>, event: GatewayEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
