mod config;
mod distribution;

use catalog::errors::UpstreamError;
use catalog::legacy::{LegacyClient, LegacySource};
use catalog::types::{ProductType, ShopId};
use clap::{Args, Parser};
use config::{Config, ConfigError};
use distribution::ShopDistribution;
use metrics_exporter_statsd::StatsdBuilder;
use product_router::config::ValidationError;
use product_router::errors::ProductRouterError;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser)]
enum CliCommand {
    /// Serve the product API
    Serve(ServeArgs),
    /// Print how one page of legacy records is spread across shops
    ShopDistribution(ShopDistributionArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(Args, Debug)]
struct ShopDistributionArgs {
    #[arg(long)]
    config_file_path: PathBuf,
    #[arg(long = "type", default_value = "catalog")]
    product_type: ProductType,
    #[arg(long, default_value_t = 200)]
    limit: u32,
    /// Only count records the legacy source attributes to this shop
    #[arg(long)]
    shop_id: Option<ShopId>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    ProductRouter(#[from] ProductRouterError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
}

fn load_config(path: &std::path::Path) -> Result<Config, CliError> {
    let mut config = Config::from_file(path)?;
    config.apply_token_overrides(|var| std::env::var(var).ok());
    config.product_router.validate()?;
    Ok(config)
}

fn init_telemetry(config: &Config) -> Result<Option<sentry::ClientInitGuard>, CliError> {
    let sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(log_layer)
        .with(sentry_layer)
        .init();

    if let Some(metrics) = &config.metrics {
        let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
            .build(Some("shopsync"))
            .map_err(|e| CliError::Metrics(e.to_string()))?;
        metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

        shared::metrics_defs::describe_all(catalog::metrics_defs::ALL_METRICS);
        shared::metrics_defs::describe_all(product_router::metrics_defs::ALL_METRICS);
    }

    Ok(sentry_guard)
}

async fn serve(args: ServeArgs) -> Result<(), CliError> {
    let config = load_config(&args.config_file_path)?;
    let _sentry_guard = init_telemetry(&config)?;

    tracing::info!("Starting product router");
    product_router::run(config.product_router).await?;
    Ok(())
}

async fn shop_distribution(args: ShopDistributionArgs) -> Result<(), CliError> {
    let config = load_config(&args.config_file_path)?;
    let _sentry_guard = init_telemetry(&config)?;

    let legacy = LegacyClient::new(&config.product_router.legacy)?;
    let records = match args.shop_id {
        Some(shop_id) => {
            legacy
                .fetch_by_shop(args.product_type, shop_id, args.limit)
                .await?
        }
        None => legacy.fetch_bulk(args.product_type, args.limit).await?,
    };

    println!("{}", ShopDistribution::from_records(&records));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    match CliCommand::parse() {
        CliCommand::Serve(args) => serve(args).await,
        CliCommand::ShopDistribution(args) => shop_distribution(args).await,
    }
}
