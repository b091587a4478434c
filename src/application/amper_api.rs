// API trait for the readings backend
use crate::domain::product::{Product, Selection, UserSummary};
use crate::domain::reading::ReadingPage;
use crate::domain::stats::UserStats;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NetworkError,
    ServerError,
    ParseError,
    InvalidRequest,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// No connectivity, refused connection or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status or a `success: false` envelope.
    #[error("Server error ({}): {message}", status_label(.status))]
    Server { status: Option<u16>, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    /// Rejected locally before any request was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::NetworkError,
            FetchError::Server { .. } => FetchErrorKind::ServerError,
            FetchError::Parse(_) => FetchErrorKind::ParseError,
            FetchError::InvalidRequest(_) => FetchErrorKind::InvalidRequest,
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "unsuccessful response".to_string(),
    }
}

#[async_trait]
pub trait AmperApi: Send + Sync {
    /// Liveness probe, checked before sign-in
    async fn health_check(&self) -> Result<(), FetchError>;

    async fn list_products(&self) -> Result<Vec<Product>, FetchError>;

    /// Users with readings on a product
    async fn list_product_users(&self, product_id: &str) -> Result<Vec<UserSummary>, FetchError>;

    /// Users with readings on one sensor of a product
    async fn list_sensor_users(
        &self,
        product_id: &str,
        sensor: &str,
    ) -> Result<Vec<UserSummary>, FetchError>;

    /// One page of readings for a selection
    async fn get_readings(
        &self,
        selection: &Selection,
        page: u32,
        limit: u32,
    ) -> Result<ReadingPage, FetchError>;

    /// Statistics over the whole filtered set. Backends may not provide this.
    async fn get_stats(&self, selection: &Selection) -> Result<UserStats, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_and_messages() {
        let err = FetchError::Server { status: Some(500), message: "boom".to_string() };
        assert_eq!(err.kind(), FetchErrorKind::ServerError);
        assert_eq!(err.to_string(), "Server error (status 500): boom");

        let err = FetchError::Server { status: None, message: "no data".to_string() };
        assert_eq!(err.to_string(), "Server error (unsuccessful response): no data");

        assert_eq!(FetchError::Network("timeout".into()).kind(), FetchErrorKind::NetworkError);
        assert_eq!(FetchError::Parse("eof".into()).kind(), FetchErrorKind::ParseError);
    }
}
