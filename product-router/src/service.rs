use crate::api::detail::DetailHandler;
use crate::api::products::ProductsHandler;
use crate::api::utils::{HandlerBody, error_response};
use crate::config::Config;
use crate::correlation::Correlator;
use crate::errors::ProductRouterError;
use crate::handler::Handler;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::router::Router;
use catalog::legacy::LegacySource;
use catalog::primary::PrimarySource;
use hyper::service::Service;
use hyper::{Request, Response};
use shared::{gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The product API: `/products` and `/products/detail` under the configured prefix.
pub struct ProductRouterService {
    router: Router,
}

impl ProductRouterService {
    pub fn new(
        config: &Config,
        primary: Arc<dyn PrimarySource>,
        legacy: Arc<dyn LegacySource>,
    ) -> Self {
        let settings = config.correlation.clone();
        let correlator = Arc::new(Correlator::new(
            legacy,
            settings.concurrency,
            Duration::from_secs(settings.deadline_secs),
        ));

        let products: Arc<dyn Handler> = Arc::new(ProductsHandler::new(
            primary.clone(),
            correlator.clone(),
            settings,
        ));
        let detail: Arc<dyn Handler> = Arc::new(DetailHandler::new(primary, correlator));

        Self {
            router: Router::new(
                &config.path_prefix,
                vec![("/products", products), ("/products/detail", detail)],
            ),
        }
    }
}

impl<B> Service<Request<B>> for ProductRouterService {
    type Response = Response<HandlerBody>;
    type Error = ProductRouterError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let router = self.router.clone();
        let (parts, _body) = req.into_parts();

        Box::pin(async move {
            let start = Instant::now();
            gauge!(REQUESTS_INFLIGHT).increment(1.0);

            let (handler, result) = router
                .route(&parts.method, parts.uri.path(), parts.uri.query())
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let status = e.status_code();
                    if status.is_server_error() {
                        tracing::error!(handler, error = %e, "Request failed");
                    } else {
                        tracing::debug!(handler, error = %e, "Request rejected");
                    }
                    error_response(&e)
                }
            };

            gauge!(REQUESTS_INFLIGHT).decrement(1.0);
            histogram!(
                REQUEST_DURATION,
                "handler" => handler,
                "status" => response.status().as_u16().to_string()
            )
            .record(start.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}
