use crate::api::ErrorResponse;
use crate::errors::{ProductRouterError, Result};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::http::{make_error_response, make_json_response};

pub type HandlerBody = BoxBody<Bytes, ProductRouterError>;

/// Deserializes the query string of a request into the specified type.
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T> {
    serde_urlencoded::from_str(query.unwrap_or_default())
        .map_err(|e| ProductRouterError::BadRequest(e.to_string()))
}

/// Serializes a value as a `200 OK` JSON response.
pub fn json_ok<T: Serialize>(value: &T) -> Result<Response<HandlerBody>> {
    Ok(make_json_response(StatusCode::OK, value)?)
}

/// JSON error body for `error`, with the status the error maps to.
pub fn error_response(error: &ProductRouterError) -> Response<HandlerBody> {
    let status = error.status_code();
    make_json_response(status, &ErrorResponse::new(error.to_string()))
        .unwrap_or_else(|_| make_error_response(status))
}
