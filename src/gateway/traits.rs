use async_trait::async_trait;
use bytes::Bytes;

use crate::error::GatewayError;

/// Raw outcome of a single GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Exactly HTTP 200
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Any 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Issue one GET. Non-2xx statuses are returned, not turned into errors.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, GatewayError>;
}
