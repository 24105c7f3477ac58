use crate::api::utils::HandlerBody;
use crate::errors::Result;
use async_trait::async_trait;
use hyper::Response;

/// Handler for one read-only endpoint of the product API
///
/// Every endpoint is a `GET` driven entirely by its query string, so the
/// handler never sees the request body.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Used as the `handler` tag on request metrics
    fn name(&self) -> &'static str;

    async fn handle(&self, query: Option<&str>) -> Result<Response<HandlerBody>>;
}
