use crate::api::SuccessResponse;
use crate::api::utils::{HandlerBody, json_ok, parse_query};
use crate::correlation::Correlator;
use crate::errors::{ProductRouterError, Result};
use crate::handler::Handler;
use async_trait::async_trait;
use catalog::primary::PrimarySource;
use catalog::types::{EnrichedProduct, ProductId};
use hyper::Response;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DetailParams {
    id: Option<ProductId>,
}

/// `GET /products/detail`: one primary product with its shop, if known.
pub struct DetailHandler {
    primary: Arc<dyn PrimarySource>,
    correlator: Arc<Correlator>,
}

impl DetailHandler {
    pub fn new(primary: Arc<dyn PrimarySource>, correlator: Arc<Correlator>) -> Self {
        Self {
            primary,
            correlator,
        }
    }
}

#[async_trait]
impl Handler for DetailHandler {
    fn name(&self) -> &'static str {
        "detail"
    }

    async fn handle(&self, query: Option<&str>) -> Result<Response<HandlerBody>> {
        let params: DetailParams = parse_query(query)?;
        let id = params
            .id
            .ok_or_else(|| ProductRouterError::BadRequest("missing id".to_string()))?;

        let product = self.primary.detail(id).await?;
        let shop_id = self
            .correlator
            .resolve_one(product.product_type.unwrap_or_default(), id)
            .await;

        json_ok(&SuccessResponse::new(
            EnrichedProduct::new(product, shop_id),
            None,
        ))
    }
}
