//! Remote procedure plumbing for registry endpoints.
//!
//! ```text
//! get_client(endpoint)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ ConnectionCache     │── ready ──────────────┐
//! └─────────┬───────────┘                       │
//!           │ absent / pending                  │
//!           ▼                                   │
//!   shared connect future ── failed ─► evict    │
//!           │                                   │
//!           ▼                                   ▼
//!      Arc<Client> ──────────► invoke(operation, args, timeout)
//!                                      │
//!                         ┌────────────┼─────────────┐
//!                         ▼            ▼             ▼
//!                       Value     RemoteFault    Timeout / Transport
//! ```
//!
//! The [`Connector`] and [`RemoteClient`] traits are the transport seam; the
//! shipped implementation speaks JSON-RPC 2.0 over HTTP (see [`http`]).

pub mod connection;
pub mod http;
pub mod invoker;

pub use connection::ConnectionCache;
pub use http::{HttpConnector, HttpRpcClient};
pub use invoker::invoke;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Failure reported by a single remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// The remote explicitly signalled a fault.
    Fault {
        /// Raw fault message as reported.
        message: String,
        /// Structured fault detail, if the remote attached any.
        detail: Option<Value>,
    },
    /// The call never produced a usable response.
    Transport(String),
}

/// A connected handle to a remote procedure endpoint.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Execute one named operation with the given arguments.
    async fn call(&self, operation: &str, args: Value) -> std::result::Result<Value, CallFailure>;
}

/// Builds [`RemoteClient`] handles for endpoint URLs.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Client type produced by this connector.
    type Client: RemoteClient;

    /// Initialize a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reached or described.
    async fn connect(&self, endpoint: &str) -> Result<Self::Client>;
}
