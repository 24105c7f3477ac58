use crate::config::UpstreamConfig;
use crate::errors::UpstreamError;
use crate::http::get;
use crate::metrics_defs::{UPSTREAM_ITEMS_SKIPPED, UPSTREAM_MALFORMED};
use crate::types::{LegacyRecord, ProductId, ProductType, ShopId};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use shared::counter;
use std::time::Duration;
use url::Url;

pub const UPSTREAM: &str = "legacy";

const LIST_PATH: &str = "product/list/";

/// Read access to the legacy listing, the only source of shop ownership.
#[async_trait]
pub trait LegacySource: Send + Sync {
    /// Fetch up to `limit` records of `product_type` in one call.
    async fn fetch_bulk(
        &self,
        product_type: ProductType,
        limit: u32,
    ) -> Result<Vec<LegacyRecord>, UpstreamError>;

    /// Fetch the record for a single id. `Ok(None)` if the id does not exist
    /// within `product_type`.
    async fn fetch_by_id(
        &self,
        product_type: ProductType,
        id: ProductId,
    ) -> Result<Option<LegacyRecord>, UpstreamError>;
}

/// `{"status": true, "data": {"items": [...]}}`
#[derive(Deserialize)]
struct LegacyEnvelope {
    #[serde(default)]
    status: Option<JsonValue>,
    #[serde(default)]
    data: Option<JsonValue>,
}

#[derive(Debug, Default)]
struct LegacyQuery {
    product_type: ProductType,
    limit: u32,
    id: Option<ProductId>,
    shop_id: Option<ShopId>,
}

/// HTTP client for `GET {base}/product/list/`.
#[derive(Clone)]
pub struct LegacyClient {
    client: reqwest::Client,
    list_url: Url,
    access_token: String,
    timeout: Duration,
}

impl LegacyClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &UpstreamConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(LegacyClient {
            client,
            list_url: config.endpoint(LIST_PATH)?,
            access_token: config.access_token.clone(),
            timeout: config.timeout(),
        })
    }

    /// Records of `product_type` the legacy source attributes to `shop_id`.
    pub async fn fetch_by_shop(
        &self,
        product_type: ProductType,
        shop_id: ShopId,
        limit: u32,
    ) -> Result<Vec<LegacyRecord>, UpstreamError> {
        self.query(LegacyQuery {
            product_type,
            limit,
            shop_id: Some(shop_id),
            ..Default::default()
        })
        .await
    }

    async fn query(&self, query: LegacyQuery) -> Result<Vec<LegacyRecord>, UpstreamError> {
        let mut url = self.list_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("access_token", &self.access_token)
                .append_pair("type", query.product_type.as_str())
                .append_pair("limit", &query.limit.to_string());
            if let Some(id) = query.id {
                pairs.append_pair("id", &id.to_string());
            }
            if let Some(shop_id) = query.shop_id {
                pairs.append_pair("shop_id", &shop_id.to_string());
            }
        }

        let response = get(&self.client, UPSTREAM, url, self.timeout).await?;
        if !response.status.is_success() {
            return Err(UpstreamError::UpstreamUnavailable(
                UPSTREAM,
                format!("status {}", response.status),
            ));
        }

        match decode_items(&response.body) {
            Err(UpstreamError::UpstreamMalformed(upstream, reason)) => {
                tracing::warn!(
                    upstream,
                    reason = %reason,
                    ?query,
                    "Treating malformed envelope as empty"
                );
                counter!(UPSTREAM_MALFORMED, "upstream" => upstream).increment(1);
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

#[async_trait]
impl LegacySource for LegacyClient {
    async fn fetch_bulk(
        &self,
        product_type: ProductType,
        limit: u32,
    ) -> Result<Vec<LegacyRecord>, UpstreamError> {
        self.query(LegacyQuery {
            product_type,
            limit,
            ..Default::default()
        })
        .await
    }

    async fn fetch_by_id(
        &self,
        product_type: ProductType,
        id: ProductId,
    ) -> Result<Option<LegacyRecord>, UpstreamError> {
        let records = self
            .query(LegacyQuery {
                product_type,
                limit: 1,
                id: Some(id),
                ..Default::default()
            })
            .await?;

        // The listing falls back to unfiltered results for some ids; only an
        // exact match counts.
        Ok(records.into_iter().find(|record| record.id == id))
    }
}

fn decode_items(body: &[u8]) -> Result<Vec<LegacyRecord>, UpstreamError> {
    let envelope: LegacyEnvelope = serde_json::from_slice(body).map_err(|e| {
        UpstreamError::UpstreamUnavailable(UPSTREAM, format!("invalid JSON envelope: {e}"))
    })?;

    if envelope.status != Some(JsonValue::Bool(true)) {
        return Err(UpstreamError::UpstreamUnavailable(
            UPSTREAM,
            "non-success envelope".to_string(),
        ));
    }

    let items = match envelope.data.as_ref().and_then(|data| data.get("items")) {
        Some(JsonValue::Array(items)) => items,
        Some(JsonValue::Null) | None => {
            return Err(UpstreamError::UpstreamMalformed(
                UPSTREAM,
                "missing data.items".to_string(),
            ));
        }
        Some(_) => {
            return Err(UpstreamError::UpstreamMalformed(
                UPSTREAM,
                "data.items is not a list".to_string(),
            ));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match LegacyRecord::deserialize(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable legacy item");
                counter!(UPSTREAM_ITEMS_SKIPPED, "upstream" => UPSTREAM).increment(1);
            }
        }
    }

    Ok(records)
}
