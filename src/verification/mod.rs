//! Cache-aside identity verification.
//!
//! # Architecture
//!
//! ```text
//! check_identity(country, local)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Check cache         │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!   HIT          MISS
//!    │             │
//!    ▼             ▼
//!  Return     Acquire subject lock
//!                  │
//!                  ▼
//!           Re-check cache ── HIT ──► Release + return
//!                  │
//!                MISS
//!                  │
//!                  ▼
//!           Query provider
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!        SUCCESS       FAILURE
//!           │             │
//!           ▼             ▼
//!   Cache with TTL   Nothing cached
//!   (valid: long,         │
//!    else: short)         │
//!           │             │
//!           └──────┬──────┘
//!                  ▼
//!            Release lock
//! ```
//!
//! The re-check under the lock is what turns N concurrent misses for the
//! same subject into one outbound call: the first holder fills the cache and
//! every later holder finds the entry.

mod service;

pub use service::{CachePolicy, ServiceStats, VerificationCacheService};
