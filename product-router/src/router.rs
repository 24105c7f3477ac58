use crate::api::utils::HandlerBody;
use crate::errors::{ProductRouterError, Result};
use crate::handler::Handler;
use hyper::{Method, Response};
use std::sync::Arc;

struct Route {
    path: String,
    handler: Arc<dyn Handler>,
}

/// Matches request paths against the product API endpoints
#[derive(Clone)]
pub struct Router {
    routes: Arc<Vec<Route>>,
}

impl Router {
    /// Creates a router serving each `(path, handler)` under `path_prefix`
    pub fn new(path_prefix: &str, handlers: Vec<(&str, Arc<dyn Handler>)>) -> Self {
        let routes = handlers
            .into_iter()
            .map(|(path, handler)| Route {
                path: format!("{path_prefix}{path}"),
                handler,
            })
            .collect();

        Self {
            routes: Arc::new(routes),
        }
    }

    /// Routes a request to its handler.
    ///
    /// Returns the name of the matched handler alongside the result, or
    /// `"none"` if nothing matched.
    pub async fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
    ) -> (&'static str, Result<Response<HandlerBody>>) {
        let Some(handler) = self.find(path) else {
            tracing::debug!(%method, path, "No route matched");
            return (
                "none",
                Err(ProductRouterError::RouteNotFound(path.to_string())),
            );
        };

        if *method != Method::GET {
            return (
                handler.name(),
                Err(ProductRouterError::MethodNotAllowed(method.clone())),
            );
        }

        tracing::debug!(handler = handler.name(), "Matched route");
        (handler.name(), handler.handle(query).await)
    }

    fn find(&self, path: &str) -> Option<&Arc<dyn Handler>> {
        // `/products/` is served as `/products`
        let path = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };

        self.routes
            .iter()
            .find(|route| route.path == path)
            .map(|route| &route.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::json_ok;
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    /// Echoes its name and query string
    struct EchoHandler(&'static str);

    #[async_trait]
    impl Handler for EchoHandler {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn handle(&self, query: Option<&str>) -> Result<Response<HandlerBody>> {
            json_ok(&serde_json::json!({"handler": self.0, "query": query}))
        }
    }

    fn test_router(prefix: &str) -> Router {
        Router::new(
            prefix,
            vec![
                (
                    "/products",
                    Arc::new(EchoHandler("products")) as Arc<dyn Handler>,
                ),
                (
                    "/products/detail",
                    Arc::new(EchoHandler("detail")) as Arc<dyn Handler>,
                ),
            ],
        )
    }

    async fn body_json(response: Response<HandlerBody>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_route_with_prefix() {
        let router = test_router("/api/v2");

        let (name, result) = router
            .route(&Method::GET, "/api/v2/products/detail", Some("id=1"))
            .await;
        assert_eq!(name, "detail");
        let response = result.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"handler": "detail", "query": "id=1"})
        );

        let (name, result) = router.route(&Method::GET, "/api/v2/products/", None).await;
        assert_eq!(name, "products");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_no_route() {
        let router = test_router("/api/v2");

        for path in ["/products", "/api/v2", "/", "/api/v2/products/other"] {
            let (name, result) = router.route(&Method::GET, path, None).await;
            assert_eq!(name, "none");
            assert!(
                matches!(result, Err(ProductRouterError::RouteNotFound(_))),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let router = test_router("");

        let (name, result) = router.route(&Method::POST, "/products", None).await;
        assert_eq!(name, "products");
        assert!(matches!(
            result,
            Err(ProductRouterError::MethodNotAllowed(m)) if m == Method::POST
        ));
    }
}
