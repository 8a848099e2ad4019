//! Per-key mutual exclusion over a [`CacheLockStore`].
//!
//! A holder owns the key while its random token sits in an atomic
//! set-if-absent marker. Contended callers poll with capped exponential
//! backoff. The holder removes its own marker once the guarded work settles,
//! on both the success and the error path. If the holding future is dropped
//! mid-flight the marker is removed from a spawned task instead. Marker
//! expiry only reclaims the key from a holder that died without releasing.

use crate::error::{Error, Result};
use crate::store::CacheLockStore;
use rand::RngCore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timing of lock acquisition and marker expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Marker expiry.
    pub ttl: Duration,
    /// Give up waiting after this long.
    pub acquire_timeout: Duration,
    /// First polling delay while contended.
    pub backoff_base: Duration,
    /// Cap on the polling delay.
    pub backoff_max: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(60),
            backoff_base: Duration::from_millis(25),
            backoff_max: Duration::from_millis(500),
        }
    }
}

/// Run `f` while holding the lock for `key`.
///
/// No other `with_lock` call for the same key against the same store runs
/// its function concurrently. The marker is removed after `f` returns,
/// whether it succeeded or failed, or when the returned future is dropped
/// before completing; `f`'s result is returned untouched.
///
/// # Errors
///
/// - [`Error::LockUnavailable`] if the key stays contended past
///   `options.acquire_timeout`
/// - any store error raised while acquiring
/// - whatever `f` returns
pub async fn with_lock<S, T, F, Fut>(
    store: &Arc<S>,
    key: &str,
    options: &LockOptions,
    f: F,
) -> Result<T>
where
    S: CacheLockStore + ?Sized + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let token = new_token();
    acquire(store.as_ref(), key, &token, options).await?;
    let guard = LockGuard {
        store: Arc::clone(store),
        key: key.to_string(),
        token,
        held: true,
    };

    let outcome = f().await;
    guard.release().await;
    outcome
}

/// Held lock marker. Dropping it while still held releases in the background.
struct LockGuard<S: CacheLockStore + ?Sized + 'static> {
    store: Arc<S>,
    key: String,
    token: String,
    held: bool,
}

impl<S: CacheLockStore + ?Sized + 'static> LockGuard<S> {
    async fn release(mut self) {
        release_marker(self.store.as_ref(), &self.key, &self.token).await;
        self.held = false;
    }
}

impl<S: CacheLockStore + ?Sized + 'static> Drop for LockGuard<S> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Lock holder for {key} was cancelled, releasing in background");
                handle.spawn(async move {
                    release_marker(store.as_ref(), &key, &token).await;
                });
            }
            Err(_) => warn!("No runtime to release lock {key}; it expires with its ttl"),
        }
    }
}

async fn release_marker<S>(store: &S, key: &str, token: &str)
where
    S: CacheLockStore + ?Sized,
{
    match store.delete_if_equals(key, token).await {
        Ok(true) => debug!("Released lock {key}"),
        Ok(false) => warn!("Lock {key} expired before release; holder overran its ttl"),
        Err(e) => warn!("Failed to release lock {key}: {e}"),
    }
}

async fn acquire<S>(store: &S, key: &str, token: &str, options: &LockOptions) -> Result<()>
where
    S: CacheLockStore + ?Sized,
{
    let deadline = Instant::now() + options.acquire_timeout;
    let mut attempt: u32 = 0;

    loop {
        if store.set_if_absent(key, token.to_string(), options.ttl).await? {
            debug!("Acquired lock {key} after {attempt} retries");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("Gave up waiting for lock {key}");
            return Err(Error::LockUnavailable {
                key: key.to_string(),
            });
        }

        let delay = backoff_for_attempt(options.backoff_base, options.backoff_max, attempt);
        tokio::time::sleep(delay.min(deadline - now)).await;
        attempt = attempt.saturating_add(1);
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Exponential backoff: `base * 2^attempt`, capped at `max`.
fn backoff_for_attempt(base: Duration, max: Duration, attempt: u32) -> Duration {
    if base.is_zero() {
        return Duration::from_millis(1);
    }
    let multiplier = 1u32 << attempt.min(8);
    base.saturating_mul(multiplier).min(max.max(base))
}
