use serde::Deserialize;
use std::time::Duration;
use url::Url;

fn default_timeout_secs() -> u64 {
    10
}

/// Connection settings for one upstream source.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL every endpoint path is appended to, e.g. `https://example.com/api/v2`
    pub base_url: Url,
    /// Sent as the `access_token` query parameter on every call
    #[serde(default)]
    pub access_token: String,
    /// Applies to the whole request including reading the body
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        UpstreamConfig {
            base_url,
            access_token: access_token.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Appends `path` to the base URL, keeping any path the base already has.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = UpstreamConfig::new(Url::parse("https://cvety.kz/api/v2").unwrap(), "t");
        assert_eq!(
            config.endpoint("products/detail").unwrap().as_str(),
            "https://cvety.kz/api/v2/products/detail"
        );

        let config = UpstreamConfig::new(Url::parse("https://cvety.kz/api/v2/").unwrap(), "t");
        assert_eq!(
            config.endpoint("/product/list/").unwrap().as_str(),
            "https://cvety.kz/api/v2/product/list/"
        );
    }

    #[test]
    fn test_default_timeout() {
        let config: UpstreamConfig =
            serde_json::from_str(r#"{"base_url": "http://127.0.0.1:8080"}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.access_token, "");
    }
}
