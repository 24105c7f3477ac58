use catalog::errors::UpstreamError;
use hyper::StatusCode;
use thiserror::Error;

/// Result type alias for product-router operations
pub type Result<T, E = ProductRouterError> = std::result::Result<T, E>;

/// Errors that can occur while serving the product API
#[derive(Error, Debug)]
pub enum ProductRouterError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(hyper::Method),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProductRouterError {
    /// Status code reported to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProductRouterError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProductRouterError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ProductRouterError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProductRouterError::Upstream(UpstreamError::NotFound(_)) => StatusCode::NOT_FOUND,
            ProductRouterError::Upstream(UpstreamError::UpstreamTimeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ProductRouterError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProductRouterError::ResponseSerializationError(_)
            | ProductRouterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
