use crate::config::UpstreamConfig;
use crate::errors::UpstreamError;
use crate::http::get;
use crate::metrics_defs::{UPSTREAM_ITEMS_SKIPPED, UPSTREAM_MALFORMED};
use crate::types::{ListCriteria, Pagination, ProductId, ProductPage, ProductRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use shared::counter;
use std::time::Duration;
use url::Url;

pub const UPSTREAM: &str = "primary";

const LIST_PATH: &str = "products";
const DETAIL_PATH: &str = "products/detail";

/// The primary product catalog. It has no notion of shops.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    async fn list(&self, criteria: &ListCriteria) -> Result<ProductPage, UpstreamError>;

    async fn detail(&self, id: ProductId) -> Result<ProductRecord, UpstreamError>;
}

/// `{"success": true, "data": ..., "pagination": {...}}`
#[derive(Deserialize)]
struct PrimaryEnvelope {
    #[serde(default)]
    success: Option<JsonValue>,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    pagination: Option<JsonValue>,
}

impl PrimaryEnvelope {
    fn is_success(&self) -> bool {
        self.success == Some(JsonValue::Bool(true))
    }
}

/// HTTP client for `GET {base}/products` and `GET {base}/products/detail`.
#[derive(Clone)]
pub struct PrimaryClient {
    client: reqwest::Client,
    list_url: Url,
    detail_url: Url,
    access_token: String,
    timeout: Duration,
}

impl PrimaryClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &UpstreamConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(PrimaryClient {
            client,
            list_url: config.endpoint(LIST_PATH)?,
            detail_url: config.endpoint(DETAIL_PATH)?,
            access_token: config.access_token.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl PrimarySource for PrimaryClient {
    async fn list(&self, criteria: &ListCriteria) -> Result<ProductPage, UpstreamError> {
        let mut url = self.list_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("access_token", &self.access_token)
                .append_pair("limit", &criteria.limit.to_string())
                .append_pair("offset", &criteria.offset.to_string());
            if let Some(product_type) = criteria.product_type {
                pairs.append_pair("type", product_type.as_str());
            }
            if let Some(is_available) = criteria.is_available {
                pairs.append_pair("isAvailable", if is_available { "true" } else { "false" });
            }
        }

        let response = get(&self.client, UPSTREAM, url, self.timeout).await?;
        if !response.status.is_success() {
            return Err(UpstreamError::UpstreamUnavailable(
                UPSTREAM,
                format!("status {}", response.status),
            ));
        }

        let envelope = decode_envelope(&response.body)?;
        if !envelope.is_success() {
            return Err(UpstreamError::UpstreamUnavailable(
                UPSTREAM,
                "non-success envelope".to_string(),
            ));
        }

        let products = match decode_products(envelope.data) {
            Ok(products) => products,
            Err(UpstreamError::UpstreamMalformed(upstream, reason)) => {
                tracing::warn!(
                    upstream,
                    reason = %reason,
                    "Treating malformed envelope as empty"
                );
                counter!(UPSTREAM_MALFORMED, "upstream" => upstream).increment(1);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let pagination = match envelope.pagination.map(Pagination::deserialize) {
            Some(Ok(pagination)) => Some(pagination),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring undecodable pagination block");
                None
            }
            None => None,
        };

        Ok(ProductPage {
            products,
            pagination,
        })
    }

    async fn detail(&self, id: ProductId) -> Result<ProductRecord, UpstreamError> {
        let mut url = self.detail_url.clone();
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("id", &id.to_string());

        let response = get(&self.client, UPSTREAM, url, self.timeout).await?;
        match response.status {
            StatusCode::NOT_FOUND => return Err(UpstreamError::NotFound(id)),
            status if !status.is_success() => {
                return Err(UpstreamError::UpstreamUnavailable(
                    UPSTREAM,
                    format!("status {status}"),
                ));
            }
            _ => {}
        }

        // The detail endpoint answers unknown ids with `success: false`.
        let envelope = decode_envelope(&response.body)?;
        if !envelope.is_success() {
            return Err(UpstreamError::NotFound(id));
        }

        match envelope.data {
            None | Some(JsonValue::Null) => Err(UpstreamError::NotFound(id)),
            Some(JsonValue::Object(fields)) if fields.is_empty() => {
                Err(UpstreamError::NotFound(id))
            }
            Some(data) => ProductRecord::deserialize(data).map_err(|e| {
                UpstreamError::UpstreamUnavailable(UPSTREAM, format!("invalid product: {e}"))
            }),
        }
    }
}

fn decode_envelope(body: &[u8]) -> Result<PrimaryEnvelope, UpstreamError> {
    serde_json::from_slice(body).map_err(|e| {
        UpstreamError::UpstreamUnavailable(UPSTREAM, format!("invalid JSON envelope: {e}"))
    })
}

fn decode_products(data: Option<JsonValue>) -> Result<Vec<ProductRecord>, UpstreamError> {
    let items = match data {
        Some(JsonValue::Array(items)) => items,
        Some(JsonValue::Null) | None => {
            return Err(UpstreamError::UpstreamMalformed(
                UPSTREAM,
                "missing data".to_string(),
            ));
        }
        Some(_) => {
            return Err(UpstreamError::UpstreamMalformed(
                UPSTREAM,
                "data is not a list".to_string(),
            ));
        }
    };

    let mut products = Vec::with_capacity(items.len());
    for item in items {
        match ProductRecord::deserialize(item) {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable product");
                counter!(UPSTREAM_ITEMS_SKIPPED, "upstream" => UPSTREAM).increment(1);
            }
        }
    }

    Ok(products)
}
