//! # registry-gateway
//!
//! Cache-and-lock coordinated gateway for verifying business (VAT)
//! identities against slow, unreliable external registries.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Gateway                     │
//! ├───────────────────────────────────────────────┤
//! │  VerificationCacheService     Reliability     │
//! │  (cache-aside + lock)         client          │
//! ├───────────────────────────┬───────────────────┤
//! │  CacheLockStore           │  Registry clients │
//! │  (MemoryStore, with_lock) │  + validators     │
//! ├───────────────────────────┴───────────────────┤
//! │  ConnectionCache  ·  invoke  ·  JSON-RPC/HTTP │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use registry_gateway::{GatewayBuilder, GatewayConfig, ProviderConfig};
//!
//! # async fn run() -> registry_gateway::Result<()> {
//! let config = GatewayConfig {
//!     business: ProviderConfig::with_endpoint("https://vies.example/rpc"),
//!     reliability: ProviderConfig::with_endpoint("https://adis.example/rpc"),
//!     ..GatewayConfig::default()
//! };
//! let gateway = GatewayBuilder::new(config).build()?;
//! let result = gateway.check_vat("CZ12345678").await?;
//! println!("valid: {}", result.valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod registry;
pub mod rpc;
pub mod store;
pub mod subject;
pub mod verification;


pub use config::{GatewayConfig, ProviderConfig};
pub use error::{Error, Result};
pub use event::{GatewayEvent, GatewayEventsChannel};
pub use gateway::{Gateway, GatewayBuilder};
pub use registry::{Reliability, StatusResult, VerificationResult};
pub use store::{CacheLockStore, MemoryStore};
pub use subject::VerificationSubject;
pub use verification::{CachePolicy, VerificationCacheService};
