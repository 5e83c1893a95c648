//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{FloodgateError, Result};
use crate::http::FailurePolicy;
use crate::ratelimit::{
    CounterStore, ExpiryMode, MemoryStore, RateLimiter, RateSpec, RedisStore, DEFAULT_KEY_PREFIX,
    DEFAULT_RATE,
};

/// Prefix of environment variables overriding file settings, e.g.
/// `FLOODGATE__RATE_LIMITING__DEFAULT_RATE=10/sec`.
const ENV_PREFIX: &str = "FLOODGATE";

/// Main configuration for the Floodgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Rate used wherever no explicit rate is given
    #[serde(default = "default_rate")]
    pub default_rate: String,

    /// Whole-traffic rate; falls back to `default_rate`
    #[serde(default)]
    pub global_rate: Option<String>,

    /// Routes with their own limit
    #[serde(default)]
    pub routes: Vec<RouteLimitConfig>,

    /// Counter storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identify callers by proxy headers instead of the peer address
    #[serde(default)]
    pub trust_proxy: bool,

    /// Behaviour when the counter store fails
    #[serde(default)]
    pub on_storage_failure: FailurePolicy,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            default_rate: default_rate(),
            global_rate: None,
            routes: Vec::new(),
            storage: StorageConfig::default(),
            trust_proxy: false,
            on_storage_failure: FailurePolicy::default(),
        }
    }
}

fn default_rate() -> String {
    DEFAULT_RATE.to_string()
}

/// A route that opts into its own limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLimitConfig {
    /// Request path, e.g. `/login`
    pub path: String,
    /// Rate for this route; falls back to `default_rate`
    #[serde(default)]
    pub rate: Option<String>,
}

/// Counter storage backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Counters local to this process
    #[default]
    Memory,
    /// Counters shared through a Redis server
    Redis {
        url: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
        #[serde(default)]
        expiry_mode: ExpiryMode,
    },
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl FloodgateConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `FLOODGATE__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: FloodgateConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FloodgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every configured rate parses.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.validate()
    }
}

impl RateLimitingConfig {
    /// Check that every configured rate parses.
    pub fn validate(&self) -> Result<()> {
        RateSpec::parse(&self.default_rate)?;
        if let Some(rate) = &self.global_rate {
            RateSpec::parse(rate)?;
        }
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(FloodgateError::Config(format!(
                    "route path '{}' must start with '/'",
                    route.path
                )));
            }
            if let Some(rate) = &route.rate {
                RateSpec::parse(rate)?;
            }
        }
        Ok(())
    }

    /// The rate enforced on all traffic.
    pub fn effective_global_rate(&self) -> &str {
        self.global_rate.as_deref().unwrap_or(&self.default_rate)
    }

    /// Build the configured counter store.
    pub async fn build_store(&self) -> Result<Arc<dyn CounterStore>> {
        match &self.storage {
            StorageConfig::Memory => {
                info!("Using in-process counter store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StorageConfig::Redis {
                url,
                key_prefix,
                expiry_mode,
            } => {
                info!(expiry_mode = ?expiry_mode, key_prefix = %key_prefix, "Using redis counter store");
                let store = RedisStore::connect(url)
                    .await?
                    .with_key_prefix(key_prefix.clone())
                    .with_expiry_mode(*expiry_mode);
                Ok(Arc::new(store))
            }
        }
    }

    /// Build the shared rate limiter over the configured store.
    pub async fn build_limiter(&self) -> Result<RateLimiter> {
        let store = self.build_store().await?;
        RateLimiter::new(store, self.default_rate.clone())
    }
}
