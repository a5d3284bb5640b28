//! Remote fetch gateway
//!
//! The sync engine only needs `fetch(url) -> (status, body)`. [`FetchGateway`]
//! is that seam; [`HttpGateway`] is the reqwest implementation used in production.

mod traits;

#[cfg(feature = "http")]
mod http;

pub use traits::{FetchGateway, FetchResponse};

#[cfg(feature = "http")]
pub use http::HttpGateway;
