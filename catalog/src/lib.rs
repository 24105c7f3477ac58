//! Clients for the two upstream catalog sources and the records they return.
//!
//! The primary source lists products without ownership data. The legacy
//! source carries the `shopId` of each product but may be incomplete.

pub mod config;
pub mod errors;
pub mod http;
pub mod legacy;
pub mod metrics_defs;
pub mod primary;
pub mod types;
