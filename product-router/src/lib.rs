//! Serves the primary product listing filtered and annotated by shop.
//!
//! Shop ownership only exists in the legacy source, so each request that
//! needs it correlates the primary page against the legacy listing first.

pub mod api;
pub mod config;
pub mod correlation;
pub mod enrich;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod router;
pub mod service;

#[cfg(test)]
mod testutils;

use crate::errors::ProductRouterError;
use crate::service::ProductRouterService;
use catalog::legacy::LegacyClient;
use catalog::primary::PrimaryClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), ProductRouterError> {
    let primary = Arc::new(PrimaryClient::new(&config.primary)?);
    let legacy = Arc::new(LegacyClient::new(&config.legacy)?);

    let router_service = ProductRouterService::new(&config, primary, legacy);
    let router_task = run_http_service(&config.listener.host, config.listener.port, router_service);

    let admin_service = AdminService::<_, ProductRouterError>::new(|| true);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(router_task, admin_task)?;
    Ok(())
}
