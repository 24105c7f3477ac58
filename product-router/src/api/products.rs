use crate::api::SuccessResponse;
use crate::api::utils::{HandlerBody, json_ok, parse_query};
use crate::config::CorrelationConfig;
use crate::correlation::{Correlator, candidate_ids};
use crate::enrich::apply;
use crate::errors::{ProductRouterError, Result};
use crate::handler::Handler;
use async_trait::async_trait;
use catalog::primary::PrimarySource;
use catalog::types::{ListCriteria, Pagination, ProductType, ShopId, ShopMapping};
use hyper::Response;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    product_type: Option<String>,
    #[serde(rename = "isAvailable")]
    is_available: Option<bool>,
    limit: Option<u32>,
    offset: Option<u32>,
    shop_id: Option<ShopId>,
    #[serde(rename = "ownerId")]
    owner_id: Option<ShopId>,
}

impl ListParams {
    fn criteria(&self) -> Result<ListCriteria> {
        let product_type = self
            .product_type
            .as_deref()
            .map(str::parse::<ProductType>)
            .transpose()
            .map_err(|e| ProductRouterError::BadRequest(e.to_string()))?;

        let defaults = ListCriteria::default();
        Ok(ListCriteria {
            product_type,
            is_available: self.is_available,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }

    fn target_shop(&self) -> Option<ShopId> {
        self.shop_id.or(self.owner_id)
    }
}

/// `GET /products`: a primary listing, filtered or annotated by shop.
pub struct ProductsHandler {
    primary: Arc<dyn PrimarySource>,
    correlator: Arc<Correlator>,
    settings: CorrelationConfig,
}

impl ProductsHandler {
    pub fn new(
        primary: Arc<dyn PrimarySource>,
        correlator: Arc<Correlator>,
        settings: CorrelationConfig,
    ) -> Self {
        Self {
            primary,
            correlator,
            settings,
        }
    }
}

#[async_trait]
impl Handler for ProductsHandler {
    fn name(&self) -> &'static str {
        "products"
    }

    async fn handle(&self, query: Option<&str>) -> Result<Response<HandlerBody>> {
        let params: ListParams = parse_query(query)?;
        let criteria = params.criteria()?;
        let target_shop = params.target_shop();

        let page = self.primary.list(&criteria).await?;

        let mapping = if target_shop.is_some() || self.settings.enrich_unfiltered {
            let candidates = candidate_ids(&page.products);
            self.correlator
                .resolve(
                    &candidates,
                    criteria.product_type.unwrap_or_default(),
                    self.settings.bulk_size(criteria.limit),
                    self.settings.per_id_cap,
                )
                .await
        } else {
            ShopMapping::new()
        };

        let returned = page.products.len();
        let data = apply(page.products, &mapping, target_shop);
        tracing::debug!(
            returned,
            kept = data.len(),
            resolved = mapping.len(),
            ?target_shop,
            "Listing served"
        );

        // Without an upstream block, describe what is actually served
        let pagination = page.pagination.unwrap_or_else(|| {
            Pagination::single_page(data.len(), criteria.limit, criteria.offset)
        });

        json_ok(&SuccessResponse::new(data, Some(pagination)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{MockLegacySource, MockPrimarySource, legacy_record, product};
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use serde_json::{Value, json};
    use std::time::Duration;

    struct Fixture {
        primary: Arc<MockPrimarySource>,
        legacy: Arc<MockLegacySource>,
        handler: ProductsHandler,
    }

    fn fixture(
        primary: MockPrimarySource,
        legacy: MockLegacySource,
        settings: CorrelationConfig,
    ) -> Fixture {
        let primary = Arc::new(primary);
        let legacy = Arc::new(legacy);
        let correlator = Arc::new(Correlator::new(
            legacy.clone(),
            settings.concurrency,
            Duration::from_secs(settings.deadline_secs),
        ));
        let handler = ProductsHandler::new(primary.clone(), correlator, settings);
        Fixture {
            primary,
            legacy,
            handler,
        }
    }

    fn scenario() -> Fixture {
        fixture(
            MockPrimarySource::new().with_page(vec![
                product(633473),
                product(633493),
                product(700000),
            ]),
            MockLegacySource::new()
                .with_bulk(vec![legacy_record(633473, Some(17008))])
                .with_record(legacy_record(633493, Some(630621))),
            CorrelationConfig::default(),
        )
    }

    async fn body_json(response: Response<HandlerBody>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_filter_by_shop() {
        let fixture = scenario();

        let response = fixture
            .handler
            .handle(Some("type=catalog&shop_id=630621"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], 633493);
        assert_eq!(body["data"][0]["shopId"], 630621);
        assert_eq!(
            body["pagination"],
            json!({"total": 1, "limit": 20, "offset": 0, "hasMore": false})
        );

        // 700000 was looked up and stayed unresolved
        assert_eq!(fixture.legacy.requested_ids(), vec![633493, 700000]);
    }

    #[tokio::test]
    async fn test_synthesized_pagination_counts_served_products() {
        let fixture = scenario();

        let body = body_json(
            fixture
                .handler
                .handle(Some("shop_id=17008&limit=5&offset=10"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["pagination"],
            json!({"total": 1, "limit": 5, "offset": 10, "hasMore": false})
        );

        let body = body_json(fixture.handler.handle(None).await.unwrap()).await;
        assert_eq!(body["pagination"]["total"], 3);

        let body = body_json(fixture.handler.handle(Some("shop_id=99")).await.unwrap()).await;
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn test_owner_id_alias() {
        let fixture = scenario();

        let body = body_json(
            fixture
                .handler
                .handle(Some("ownerId=17008"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"][0]["id"], 633473);

        // shop_id wins over ownerId
        let body = body_json(
            fixture
                .handler
                .handle(Some("ownerId=17008&shop_id=630621"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"][0]["id"], 633493);
    }

    #[tokio::test]
    async fn test_no_filter_skips_legacy() {
        let fixture = scenario();

        let body = body_json(fixture.handler.handle(None).await.unwrap()).await;

        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert!(data.iter().all(|p| p.get("shopId").is_none()));
        assert_eq!(fixture.legacy.bulk_calls(), 0);
        assert_eq!(fixture.legacy.by_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_enrich_unfiltered() {
        let fixture = fixture(
            MockPrimarySource::new().with_page(vec![product(1), product(2)]),
            MockLegacySource::new().with_bulk(vec![legacy_record(1, Some(10))]),
            CorrelationConfig {
                enrich_unfiltered: true,
                ..Default::default()
            },
        );

        let body = body_json(fixture.handler.handle(None).await.unwrap()).await;

        assert_eq!(body["data"][0]["shopId"], 10);
        assert!(body["data"][1].get("shopId").is_none());
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_criteria_forwarded() {
        let fixture = fixture(
            MockPrimarySource::new()
                .with_page(vec![product(1)])
                .with_pagination(Pagination {
                    total: 500,
                    limit: 150,
                    offset: 300,
                    has_more: true,
                }),
            MockLegacySource::new().with_bulk(vec![]),
            CorrelationConfig::default(),
        );

        let body = body_json(
            fixture
                .handler
                .handle(Some("type=vitrina&isAvailable=false&limit=150&offset=300&shop_id=1"))
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(
            fixture.primary.list_requests(),
            vec![ListCriteria {
                product_type: Some(ProductType::Vitrina),
                is_available: Some(false),
                limit: 150,
                offset: 300,
            }]
        );
        // Bulk pass asks for at least the page size
        assert_eq!(
            fixture.legacy.bulk_requests(),
            vec![(ProductType::Vitrina, 150)]
        );
        // Upstream pagination is passed through even though the filter
        // emptied the page
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["total"], 500);
        assert_eq!(body["pagination"]["hasMore"], true);
    }

    #[tokio::test]
    async fn test_bulk_pass_size_is_capped() {
        let fixture = scenario();

        fixture
            .handler
            .handle(Some("shop_id=1&limit=4000000000"))
            .await
            .unwrap();

        assert_eq!(
            fixture.legacy.bulk_requests(),
            vec![(ProductType::Catalog, 1000)]
        );
    }

    #[tokio::test]
    async fn test_legacy_type_defaults_to_catalog() {
        let fixture = scenario();

        fixture.handler.handle(Some("shop_id=1")).await.unwrap();

        assert_eq!(
            fixture.legacy.bulk_requests(),
            vec![(ProductType::Catalog, 100)]
        );
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let fixture = scenario();

        for query in ["type=shop", "limit=-1", "shop_id=abc", "isAvailable=maybe"] {
            let result = fixture.handler.handle(Some(query)).await;
            assert!(
                matches!(result, Err(ProductRouterError::BadRequest(_))),
                "{query}"
            );
        }
        assert!(fixture.primary.list_requests().is_empty());
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal() {
        let fixture = fixture(
            MockPrimarySource::new(),
            MockLegacySource::new().with_bulk(vec![]),
            CorrelationConfig::default(),
        );

        let result = fixture.handler.handle(Some("shop_id=1")).await;

        assert!(matches!(
            result,
            Err(ProductRouterError::Upstream(
                catalog::errors::UpstreamError::UpstreamUnavailable(..)
            ))
        ));
        assert_eq!(fixture.legacy.bulk_calls(), 0);
    }

    #[tokio::test]
    async fn test_legacy_outage_excludes_everything() {
        let fixture = fixture(
            MockPrimarySource::new().with_page(vec![product(1), product(2)]),
            MockLegacySource::new().with_failing_id(1).with_failing_id(2),
            CorrelationConfig::default(),
        );

        let response = fixture.handler.handle(Some("shop_id=10")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"], json!([]));
    }
}
