pub mod detail;
pub mod products;
pub mod utils;

use catalog::types::Pagination;
use serde::Serialize;

/// `{"success": true, "data": ..., "pagination": ...}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T, pagination: Option<Pagination>) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

/// `{"success": false, "error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
