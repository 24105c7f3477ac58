use crate::config::{Config, CorrelationConfig, Listener};
use async_trait::async_trait;
use catalog::config::UpstreamConfig;
use catalog::errors::UpstreamError;
use catalog::legacy::LegacySource;
use catalog::primary::PrimarySource;
use catalog::types::{
    LegacyRecord, ListCriteria, Pagination, ProductId, ProductPage, ProductRecord, ProductType,
    ShopId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub fn legacy_record(id: ProductId, shop_id: Option<ShopId>) -> LegacyRecord {
    LegacyRecord {
        id,
        name: format!("legacy {id}"),
        shop_id,
        created_at: None,
        section_id: None,
    }
}

pub fn product(id: ProductId) -> ProductRecord {
    let mut extra_fields = serde_json::Map::new();
    extra_fields.insert("title".to_string(), serde_json::json!(format!("product {id}")));
    ProductRecord {
        id,
        name: None,
        product_type: Some(ProductType::Catalog),
        is_available: Some(true),
        extra_fields,
    }
}

pub fn test_config() -> Config {
    Config {
        listener: Listener {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        admin_listener: Listener {
            host: "127.0.0.1".to_string(),
            port: 3001,
        },
        path_prefix: "/api/v2".to_string(),
        primary: UpstreamConfig::new(Url::parse("http://primary.invalid").unwrap(), "token"),
        legacy: UpstreamConfig::new(Url::parse("http://legacy.invalid").unwrap(), "token"),
        correlation: CorrelationConfig::default(),
    }
}

/// In-memory legacy source that counts calls and can inject failures.
#[derive(Default)]
pub struct MockLegacySource {
    bulk: Option<Vec<LegacyRecord>>,
    by_id: HashMap<ProductId, LegacyRecord>,
    failing_ids: HashSet<ProductId>,
    per_id_delay: Option<Duration>,
    bulk_calls: AtomicUsize,
    by_id_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed_lookups: AtomicUsize,
    requested_ids: Mutex<Vec<ProductId>>,
    bulk_requests: Mutex<Vec<(ProductType, u32)>>,
}

impl MockLegacySource {
    /// A source whose bulk pass fails until `with_bulk` is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bulk(mut self, records: Vec<LegacyRecord>) -> Self {
        self.bulk = Some(records);
        self
    }

    pub fn with_record(mut self, record: LegacyRecord) -> Self {
        self.by_id.insert(record.id, record);
        self
    }

    pub fn with_failing_id(mut self, id: ProductId) -> Self {
        self.failing_ids.insert(id);
        self
    }

    pub fn with_per_id_delay(mut self, delay: Duration) -> Self {
        self.per_id_delay = Some(delay);
        self
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn by_id_calls(&self) -> usize {
        self.by_id_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Per-id lookups that ran to completion, as opposed to being cancelled.
    pub fn completed_lookups(&self) -> usize {
        self.completed_lookups.load(Ordering::SeqCst)
    }

    pub fn requested_ids(&self) -> Vec<ProductId> {
        let mut ids = self.requested_ids.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }

    pub fn bulk_requests(&self) -> Vec<(ProductType, u32)> {
        self.bulk_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LegacySource for MockLegacySource {
    async fn fetch_bulk(
        &self,
        product_type: ProductType,
        limit: u32,
    ) -> Result<Vec<LegacyRecord>, UpstreamError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.bulk_requests
            .lock()
            .unwrap()
            .push((product_type, limit));

        match &self.bulk {
            Some(records) => Ok(records.iter().take(limit as usize).cloned().collect()),
            None => Err(UpstreamError::UpstreamUnavailable(
                "legacy",
                "status 503 Service Unavailable".to_string(),
            )),
        }
    }

    async fn fetch_by_id(
        &self,
        _product_type: ProductType,
        id: ProductId,
    ) -> Result<Option<LegacyRecord>, UpstreamError> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_ids.lock().unwrap().push(id);

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        {
            // Released on drop so a cancelled lookup is no longer counted
            let _guard = InFlightGuard(&self.in_flight);
            if let Some(delay) = self.per_id_delay {
                tokio::time::sleep(delay).await;
            }
        }
        self.completed_lookups.fetch_add(1, Ordering::SeqCst);

        if self.failing_ids.contains(&id) {
            return Err(UpstreamError::UpstreamTimeout("legacy"));
        }
        Ok(self.by_id.get(&id).cloned())
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory primary source serving one page and a set of details.
#[derive(Default)]
pub struct MockPrimarySource {
    page: Option<Vec<ProductRecord>>,
    pagination: Option<Pagination>,
    details: HashMap<ProductId, ProductRecord>,
    list_requests: Mutex<Vec<ListCriteria>>,
}

impl MockPrimarySource {
    /// A source whose listing fails until `with_page` is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, products: Vec<ProductRecord>) -> Self {
        self.page = Some(products);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_detail(mut self, product: ProductRecord) -> Self {
        self.details.insert(product.id, product);
        self
    }

    pub fn list_requests(&self) -> Vec<ListCriteria> {
        self.list_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimarySource for MockPrimarySource {
    async fn list(&self, criteria: &ListCriteria) -> Result<ProductPage, UpstreamError> {
        self.list_requests.lock().unwrap().push(criteria.clone());

        let products = self.page.clone().ok_or_else(|| {
            UpstreamError::UpstreamUnavailable("primary", "non-success envelope".to_string())
        })?;
        Ok(ProductPage {
            products,
            pagination: self.pagination.clone(),
        })
    }

    async fn detail(&self, id: ProductId) -> Result<ProductRecord, UpstreamError> {
        self.details
            .get(&id)
            .cloned()
            .ok_or(UpstreamError::NotFound(id))
    }
}
