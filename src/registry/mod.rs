//! External registry clients.
//!
//! Each client composes the same three steps for one lookup: fetch the
//! shared handle from a [`ConnectionCache`](crate::rpc::ConnectionCache),
//! [`invoke`](crate::rpc::invoke) one operation under the provider's timeout,
//! then hand the payload to the matching validator.

pub mod business;
pub mod reliability;
pub mod types;
pub mod validator;

pub use business::BusinessRegistryClient;
pub use reliability::ReliabilityRegistryClient;
pub use types::{BankAccount, Reliability, StatusResult, VerificationResult};

use crate::error::Result;
use crate::subject::VerificationSubject;
use async_trait::async_trait;

/// A source of identity verdicts that the cache service can front.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short stable name used in cache and lock keys.
    fn name(&self) -> &str;

    /// Look `subject` up at the source.
    ///
    /// # Errors
    ///
    /// Returns the provider's failure unchanged; callers decide on retries.
    async fn verify(&self, subject: &VerificationSubject) -> Result<VerificationResult>;
}
