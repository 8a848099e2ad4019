//! Configuration for registry-gateway.

use crate::error::{Error, Result};
use crate::store::LockOptions;
use crate::subject::VerificationSubject;
use crate::verification::CachePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Business (VAT) registry used by identity checks.
    #[serde(default)]
    pub business: ProviderConfig,

    /// Reliability registry used by status lookups.
    #[serde(default)]
    pub reliability: ProviderConfig,

    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-subject lock configuration.
    #[serde(default)]
    pub lock: LockConfig,

    /// HTTP transport configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings for one external registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Endpoint URL. Required.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Budget for one outbound call in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Identity of the requesting business, sent so the registry can issue a
    /// request identifier.
    #[serde(default)]
    pub requester_vat: Option<String>,
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of `valid=true` results in seconds.
    #[serde(default = "default_positive_ttl")]
    pub positive_ttl_secs: u64,

    /// Lifetime of negative or inconclusive results in seconds.
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl_secs: u64,

    /// Maximum number of entries in the in-process store.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Lock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Expiry of a lock marker in milliseconds (safety net for a crashed holder).
    #[serde(default = "default_lock_ttl")]
    pub ttl_ms: u64,

    /// How long a contended caller waits before giving up, in milliseconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,

    /// First retry delay while contended, in milliseconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound on the retry delay, in milliseconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// User agent sent to registries.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Check the endpoint answers HTTP while connecting.
    #[serde(default = "default_check_reachability")]
    pub check_reachability: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            requester_vat: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            positive_ttl_secs: default_positive_ttl(),
            negative_ttl_secs: default_negative_ttl(),
            capacity: default_capacity(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_lock_ttl(),
            acquire_timeout_ms: default_acquire_timeout(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            user_agent: default_user_agent(),
            check_reachability: default_check_reachability(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_positive_ttl() -> u64 {
    24 * 3600
}

const fn default_negative_ttl() -> u64 {
    3600
}

const fn default_capacity() -> usize {
    100_000
}

const fn default_lock_ttl() -> u64 {
    30_000
}

const fn default_acquire_timeout() -> u64 {
    60_000
}

const fn default_backoff_base() -> u64 {
    25
}

const fn default_backoff_max() -> u64 {
    500
}

const fn default_connect_timeout() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    format!("registry-gateway/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_check_reachability() -> bool {
    true
}

/// Default location of the configuration file, if the platform has one.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "registry-gateway")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration once, before anything is constructed from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.business.validate("business")?;
        self.reliability.validate("reliability")?;

        if self.cache.negative_ttl_secs == 0 {
            return Err(Error::Configuration(
                "cache.negative_ttl_secs must be positive".to_string(),
            ));
        }
        if self.cache.positive_ttl_secs <= self.cache.negative_ttl_secs {
            return Err(Error::Configuration(
                "cache.positive_ttl_secs must exceed cache.negative_ttl_secs".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(Error::Configuration("cache.capacity must be positive".to_string()));
        }

        if self.lock.ttl_ms <= self.business.timeout_ms {
            return Err(Error::Configuration(
                "lock.ttl_ms must exceed business.timeout_ms".to_string(),
            ));
        }
        if self.lock.backoff_base_ms == 0 || self.lock.backoff_base_ms > self.lock.backoff_max_ms {
            return Err(Error::Configuration(
                "lock backoff requires 0 < backoff_base_ms <= backoff_max_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Cache lifetimes as a policy.
    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            positive_ttl: Duration::from_secs(self.cache.positive_ttl_secs),
            negative_ttl: Duration::from_secs(self.cache.negative_ttl_secs),
        }
    }

    /// Lock timings as options for `with_lock`.
    #[must_use]
    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            ttl: Duration::from_millis(self.lock.ttl_ms),
            acquire_timeout: Duration::from_millis(self.lock.acquire_timeout_ms),
            backoff_base: Duration::from_millis(self.lock.backoff_base_ms),
            backoff_max: Duration::from_millis(self.lock.backoff_max_ms),
        }
    }
}

impl ProviderConfig {
    /// Create a provider config for `endpoint` with default timings.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Outbound call budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no endpoint is set.
    pub fn require_endpoint(&self, section: &str) -> Result<&str> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(Error::Configuration(format!("{section}.endpoint is required"))),
        }
    }

    /// Parsed requester identity, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the requester VAT is malformed.
    pub fn requester(&self, section: &str) -> Result<Option<VerificationSubject>> {
        self.requester_vat
            .as_deref()
            .map(|vat| {
                VerificationSubject::parse(vat).map_err(|e| {
                    Error::Configuration(format!("{section}.requester_vat is invalid: {e}"))
                })
            })
            .transpose()
    }

    fn validate(&self, section: &str) -> Result<()> {
        let endpoint = self.require_endpoint(section)?;
        reqwest::Url::parse(endpoint).map_err(|e| {
            Error::Configuration(format!("{section}.endpoint is not a valid URL: {e}"))
        })?;
        if self.timeout_ms == 0 {
            return Err(Error::Configuration(format!(
                "{section}.timeout_ms must be positive"
            )));
        }
        self.requester(section)?;
        Ok(())
    }
}
