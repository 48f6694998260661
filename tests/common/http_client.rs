//! HTTP client helpers for tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        expected: u16,
    ) -> Result<T, TestClientError> {
        let status = resp.status().as_u16();
        if status == expected {
            Ok(resp.json().await?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/healthz")).send().await?;
        Self::expect_json(resp, 200).await
    }

    pub async fn ready(&self) -> Result<ReadyResponse, TestClientError> {
        let resp = self.client.get(self.url("/ready")).send().await?;
        Self::expect_json(resp, 200).await
    }

    pub async fn create_book(&self, book: serde_json::Value) -> Result<BookBody, TestClientError> {
        let resp = self.client.post(self.url("/books")).json(&book).send().await?;
        Self::expect_json(resp, 201).await
    }

    pub async fn list_books(&self, limit: usize) -> Result<Vec<BookBody>, TestClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/books?limit={limit}")))
            .send()
            .await?;
        Self::expect_json(resp, 200).await
    }

    pub async fn get_book(&self, id: &str) -> Result<reqwest::Response, TestClientError> {
        Ok(self
            .client
            .get(self.url(&format!("/books/{id}")))
            .send()
            .await?)
    }

    pub async fn delete_book(&self, id: &str) -> Result<u16, TestClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/books/{id}")))
            .send()
            .await?;
        Ok(resp.status().as_u16())
    }

    /// Posts a recommendation request; returns the status and the raw JSON body.
    pub async fn recommend(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(u16, serde_json::Value), TestClientError> {
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentStatus {
    pub http: String,
    pub vectordb: String,
    pub embedder_mode: String,
    pub embedding_dim: usize,
    pub catalog: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub components: ComponentStatus,
}

impl ReadyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookBody {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub review: String,
    pub rating: f64,
    pub tags: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8000");
        assert_eq!(client.url("/healthz"), "http://localhost:8000/healthz");
        assert_eq!(client.url("healthz"), "http://localhost:8000/healthz");
    }
}
