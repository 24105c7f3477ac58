use crate::errors::UpstreamError;
use crate::metrics_defs::UPSTREAM_REQUEST_DURATION;
use reqwest::StatusCode;
use shared::histogram;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

/// Status and fully collected body of an upstream response.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Issue a single GET against an upstream. No retries happen here.
///
/// The timeout covers the entire exchange, including collecting the body.
/// Error messages never carry the URL since it contains the access token.
pub async fn get(
    client: &reqwest::Client,
    upstream: &'static str,
    url: Url,
    timeout_after: Duration,
) -> Result<UpstreamResponse, UpstreamError> {
    let start = Instant::now();

    let exchange = async {
        let response = client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok::<_, reqwest::Error>(UpstreamResponse { status, body })
    };

    let result = timeout(timeout_after, exchange)
        .await
        // tokio::time::timeout returns Err if the duration elapsed
        .map_err(|_| UpstreamError::UpstreamTimeout(upstream))
        .and_then(|res| {
            res.map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::UpstreamTimeout(upstream)
                } else {
                    UpstreamError::UpstreamUnavailable(upstream, e.without_url().to_string())
                }
            })
        });

    let outcome = match &result {
        Ok(res) if res.status.is_success() => "success",
        Ok(_) => "error_status",
        Err(UpstreamError::UpstreamTimeout(_)) => "timeout",
        Err(_) => "error",
    };
    histogram!(UPSTREAM_REQUEST_DURATION, "upstream" => upstream, "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());

    result
}
