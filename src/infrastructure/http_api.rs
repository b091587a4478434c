// HTTP implementation of the readings API
use crate::application::amper_api::{AmperApi, FetchError};
use crate::domain::product::{Product, Selection, UserSummary};
use crate::domain::reading::ReadingPage;
use crate::domain::stats::UserStats;
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAmperApi {
    base_url: String,
    client: reqwest::Client,
}

/// Every endpoint wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn describe_failure(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "request was not successful".to_string())
    }
}

/// Error bodies may carry any `data`; only the message matters.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpAmperApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn user_path(&self, selection: &Selection) -> String {
        format!(
            "/api/products/{}/users/{}/readings",
            urlencoding::encode(&selection.product_id),
            urlencoding::encode(&selection.username)
        )
    }

    async fn request<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Envelope<T>, FetchError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("API request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            tracing::debug!("API response error: {} {}", status, message);
            return Err(FetchError::Server {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        if !envelope.success {
            return Err(FetchError::Server {
                status: None,
                message: envelope.describe_failure(),
            });
        }

        Ok(envelope)
    }

    async fn fetch_data<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, FetchError> {
        self.request::<T>(path_and_query)
            .await?
            .data
            .ok_or_else(|| FetchError::Parse(format!("response to {} has no data", path_and_query)))
    }
}

#[async_trait]
impl AmperApi for HttpAmperApi {
    async fn health_check(&self) -> Result<(), FetchError> {
        self.request::<serde_json::Value>("/api/health").await.map(|_| ())
    }

    async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        self.fetch_data("/api/products").await
    }

    async fn list_product_users(&self, product_id: &str) -> Result<Vec<UserSummary>, FetchError> {
        let path = format!("/api/products/{}/users", urlencoding::encode(product_id));
        self.fetch_data(&path).await
    }

    async fn list_sensor_users(
        &self,
        product_id: &str,
        sensor: &str,
    ) -> Result<Vec<UserSummary>, FetchError> {
        let path = format!(
            "/api/products/{}/users/sensor?sensor={}",
            urlencoding::encode(product_id),
            urlencoding::encode(sensor)
        );
        self.fetch_data(&path).await
    }

    async fn get_readings(
        &self,
        selection: &Selection,
        page: u32,
        limit: u32,
    ) -> Result<ReadingPage, FetchError> {
        let path = format!(
            "{}?sensor={}&timeRange={}&limit={}&page={}",
            self.user_path(selection),
            urlencoding::encode(&selection.sensor),
            selection.time_range.token(),
            limit,
            page
        );
        self.fetch_data(&path).await
    }

    async fn get_stats(&self, selection: &Selection) -> Result<UserStats, FetchError> {
        let path = format!(
            "{}/stats?sensor={}&timeRange={}",
            self.user_path(selection),
            urlencoding::encode(&selection.sensor),
            selection.time_range.token()
        );
        self.fetch_data(&path).await
    }
}
