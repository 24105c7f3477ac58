use crate::types::ProductId;
use thiserror::Error;

/// Errors raised while talking to either upstream source.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Transport failure, non-success HTTP status or non-success envelope.
    #[error("upstream {0} unavailable: {1}")]
    UpstreamUnavailable(&'static str, String),

    #[error("upstream {0} timed out")]
    UpstreamTimeout(&'static str),

    /// A success envelope without the expected payload. Callers treat this as
    /// an empty result.
    #[error("upstream {0} returned a malformed envelope: {1}")]
    UpstreamMalformed(&'static str, String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
