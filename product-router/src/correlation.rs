//! Resolves the shop of primary products through the legacy source.
//!
//! The legacy bulk listing is cheap but may be truncated or lag behind the
//! primary source, so ids it misses get a targeted lookup each. Those lookups
//! are capped, which bounds a request to `1 + per_id_cap` legacy calls.
//!
//! Legacy failures never fail the request. A failed bulk pass degrades to
//! per-id lookups for every candidate, and a failed lookup leaves its id
//! unresolved.

use crate::metrics_defs::{
    CORRELATION_BULK_FAILURES, CORRELATION_PER_ID_CALLS, CORRELATION_UNRESOLVED,
};
use catalog::legacy::LegacySource;
use catalog::types::{LegacyRecord, ProductId, ProductRecord, ProductType, ShopId, ShopMapping};
use indexmap::IndexSet;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;

/// Candidate ids in the order the primary source returned them.
pub fn candidate_ids(products: &[ProductRecord]) -> IndexSet<ProductId> {
    products.iter().map(|product| product.id).collect()
}

pub struct Correlator {
    legacy: Arc<dyn LegacySource>,
    /// Maximum number of per-id lookups in flight at once
    concurrency: usize,
    /// Budget for the whole per-id phase
    deadline: Duration,
}

impl Correlator {
    pub fn new(legacy: Arc<dyn LegacySource>, concurrency: usize, deadline: Duration) -> Self {
        Self {
            legacy,
            concurrency: concurrency.max(1),
            deadline,
        }
    }

    /// Builds the id to shop mapping for `candidates`.
    ///
    /// Ids beyond the first `per_id_cap` missing ones are left unresolved.
    /// Dropping the returned future aborts any lookups still in flight.
    pub async fn resolve(
        &self,
        candidates: &IndexSet<ProductId>,
        product_type: ProductType,
        bulk_limit: u32,
        per_id_cap: usize,
    ) -> ShopMapping {
        let mut mapping = ShopMapping::new();
        if candidates.is_empty() {
            return mapping;
        }

        match self.legacy.fetch_bulk(product_type, bulk_limit).await {
            Ok(records) => {
                for record in records.iter().filter(|r| candidates.contains(&r.id)) {
                    mapping.observe(record);
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    %product_type,
                    candidates = candidates.len(),
                    "Bulk legacy pass failed, falling back to per-id lookups"
                );
                counter!(CORRELATION_BULK_FAILURES).increment(1);
            }
        }
        let bulk_hits = mapping.len();

        let missing: Vec<ProductId> = candidates
            .iter()
            .copied()
            .filter(|id| !mapping.contains(*id))
            .collect();
        let lookups = &missing[..missing.len().min(per_id_cap)];

        if lookups.len() < missing.len() {
            tracing::debug!(
                missing = missing.len(),
                per_id_cap,
                "Leaving ids beyond the per-id cap unresolved"
            );
        }

        for record in self.lookup_each(product_type, lookups).await {
            mapping.observe(&record);
        }

        let unresolved = candidates.len() - mapping.len();
        histogram!(CORRELATION_UNRESOLVED).record(unresolved as f64);
        tracing::debug!(
            candidates = candidates.len(),
            bulk_hits,
            lookups = lookups.len(),
            unresolved,
            "Correlation finished"
        );

        mapping
    }

    /// Shop of a single product, without a bulk pass.
    pub async fn resolve_one(&self, product_type: ProductType, id: ProductId) -> Option<ShopId> {
        counter!(CORRELATION_PER_ID_CALLS, "outcome" => "issued").increment(1);
        match self.legacy.fetch_by_id(product_type, id).await {
            Ok(record) => record.and_then(|r| r.shop_id),
            Err(e) => {
                tracing::warn!(product_id = id, error = %e, "Legacy lookup failed");
                None
            }
        }
    }

    /// Looks up every id in `ids`, at most `concurrency` at a time.
    ///
    /// Returns the records that were found before the deadline. Failures and
    /// lookups cut off by the deadline are logged and skipped.
    async fn lookup_each(&self, product_type: ProductType, ids: &[ProductId]) -> Vec<LegacyRecord> {
        let mut found = Vec::new();
        if ids.is_empty() {
            return found;
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for &id in ids {
            let legacy = self.legacy.clone();
            let permits = permits.clone();

            join_set.spawn(async move {
                // Held until the lookup completes; the semaphore is never closed
                let _permit = permits.acquire_owned().await;
                counter!(CORRELATION_PER_ID_CALLS, "outcome" => "issued").increment(1);
                (id, legacy.fetch_by_id(product_type, id).await)
            });
        }

        let deadline = sleep(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!(
                        pending = join_set.len(),
                        deadline = ?self.deadline,
                        "Per-id lookups exceeded deadline, leaving the rest unresolved"
                    );
                    join_set.abort_all();
                    break;
                }
                join_result = join_set.join_next() => {
                    match join_result {
                        Some(Ok((_, Ok(Some(record))))) => found.push(record),
                        Some(Ok((id, Ok(None)))) => {
                            tracing::debug!(product_id = id, "Product unknown to legacy source");
                        }
                        Some(Ok((id, Err(e)))) => {
                            tracing::warn!(product_id = id, error = %e, "Per-id legacy lookup failed");
                            counter!(CORRELATION_PER_ID_CALLS, "outcome" => "failed").increment(1);
                        }
                        Some(Err(e)) => tracing::error!("Task panicked: {}", e),
                        // No more tasks
                        None => break,
                    }
                }
            }
        }

        found
    }
}
