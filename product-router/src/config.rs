use catalog::config::UpstreamConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty access token for upstream {0}")]
    EmptyAccessToken(&'static str),

    #[error("Timeout for upstream {0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Correlation bulk_limit cannot be 0")]
    ZeroBulkLimit,

    #[error("Correlation max_bulk_limit {max} is below bulk_limit {min}")]
    BulkLimitCeilingTooLow { min: u32, max: u32 },

    #[error("Correlation concurrency cannot be 0")]
    ZeroConcurrency,

    #[error("Correlation deadline_secs cannot be 0")]
    ZeroDeadline,

    #[error("Path prefix must start with '/' and not end with it: {0}")]
    InvalidPathPrefix(String),
}

/// Product router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for the product API
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// Prepended to `/products` and `/products/detail`, e.g. `/api/v2`
    #[serde(default)]
    pub path_prefix: String,
    /// Source of product listings and details
    pub primary: UpstreamConfig,
    /// Source of shop ownership
    pub legacy: UpstreamConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl Config {
    /// Validates the product router configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        for (name, upstream) in [("primary", &self.primary), ("legacy", &self.legacy)] {
            if upstream.access_token.is_empty() {
                return Err(ValidationError::EmptyAccessToken(name));
            }
            if upstream.timeout_secs == 0 {
                return Err(ValidationError::ZeroTimeout(name));
            }
        }

        if !self.path_prefix.is_empty()
            && (!self.path_prefix.starts_with('/') || self.path_prefix.ends_with('/'))
        {
            return Err(ValidationError::InvalidPathPrefix(self.path_prefix.clone()));
        }

        self.correlation.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Cost bounds for resolving shops through the legacy source.
///
/// A single request costs at most `1 + per_id_cap` legacy calls.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Minimum number of records requested by the bulk pass
    pub bulk_limit: u32,
    /// Upper bound on the bulk pass size, whatever page size the caller asks for
    pub max_bulk_limit: u32,
    /// Maximum number of per-id fallback lookups. 0 disables the fallback.
    pub per_id_cap: usize,
    /// Maximum number of per-id lookups in flight at once
    pub concurrency: usize,
    /// Lookups still running after this long are abandoned and their ids stay unresolved
    pub deadline_secs: u64,
    /// Also resolve shops for listings without a shop filter
    pub enrich_unfiltered: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        CorrelationConfig {
            bulk_limit: 100,
            max_bulk_limit: 1000,
            per_id_cap: 50,
            concurrency: 8,
            deadline_secs: 15,
            enrich_unfiltered: false,
        }
    }
}

impl CorrelationConfig {
    /// Records requested by the bulk pass for a primary page of `page_limit`.
    pub fn bulk_size(&self, page_limit: u32) -> u32 {
        page_limit.max(self.bulk_limit).min(self.max_bulk_limit)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bulk_limit == 0 {
            return Err(ValidationError::ZeroBulkLimit);
        }
        if self.max_bulk_limit < self.bulk_limit {
            return Err(ValidationError::BulkLimitCeilingTooLow {
                min: self.bulk_limit,
                max: self.max_bulk_limit,
            });
        }
        if self.concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        if self.deadline_secs == 0 {
            return Err(ValidationError::ZeroDeadline);
        }
        Ok(())
    }
}
