use product_router::config::Config as ProductRouterConfig;
use serde::Deserialize;
use std::fs::File;

pub const PRIMARY_TOKEN_ENV: &str = "SHOPSYNC_PRIMARY_ACCESS_TOKEN";
pub const LEGACY_TOKEN_ENV: &str = "SHOPSYNC_LEGACY_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
    pub product_router: ProductRouterConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Fills access tokens left empty in the file from `lookup`.
    pub fn apply_token_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstreams = [
            (PRIMARY_TOKEN_ENV, &mut self.product_router.primary),
            (LEGACY_TOKEN_ENV, &mut self.product_router.legacy),
        ];
        for (var, upstream) in upstreams {
            if upstream.access_token.is_empty()
                && let Some(token) = lookup(var)
            {
                upstream.access_token = token;
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}
