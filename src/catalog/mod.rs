//! Aladin Open API client (bibliographic search, ISBN lookup, bestsellers).
//!
//! Without an API key every call fails with [`CatalogError::NotConfigured`].

pub mod error;
pub mod model;


pub use error::{CatalogError, CatalogResult};
pub use model::{CatalogItem, CatalogSearchResponse, QueryType};

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "http://www.aladin.co.kr/ttb/api";

/// The API rejects pages larger than this.
pub const MAX_RESULTS_LIMIT: u32 = 50;

const API_VERSION: &str = "20131101";

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Creates a client; an empty or absent key leaves the catalog unconfigured.
    pub fn new(api_key: Option<String>, timeout: Duration) -> CatalogResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Points the client at another endpoint (e.g. a local fake).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Searches the catalog. `max_results` is clamped to `1..=50`.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        query_type: QueryType,
        max_results: u32,
        start: u32,
    ) -> CatalogResult<CatalogSearchResponse> {
        let params = vec![
            ("Query", query.to_string()),
            ("QueryType", query_type.as_str().to_string()),
            ("MaxResults", clamp_max_results(max_results).to_string()),
            ("start", start.max(1).to_string()),
        ];

        self.get("ItemSearch.aspx", params).await
    }

    /// Looks a book up by ISBN-13 (13 characters) or ISBN-10.
    #[instrument(skip(self))]
    pub async fn lookup(&self, isbn: &str) -> CatalogResult<Option<CatalogItem>> {
        let id_type = if isbn.chars().count() == 13 {
            "ISBN13"
        } else {
            "ISBN"
        };

        let params = vec![
            ("itemIdType", id_type.to_string()),
            ("ItemId", isbn.to_string()),
        ];

        let response: CatalogSearchResponse = self.get("ItemLookUp.aspx", params).await?;
        Ok(response.items.into_iter().next())
    }

    /// Current bestsellers; `category_id` 0 means all categories.
    #[instrument(skip(self))]
    pub async fn bestsellers(
        &self,
        category_id: u32,
        max_results: u32,
    ) -> CatalogResult<CatalogSearchResponse> {
        let params = vec![
            ("QueryType", "Bestseller".to_string()),
            ("MaxResults", clamp_max_results(max_results).to_string()),
            ("start", "1".to_string()),
            ("CategoryId", category_id.to_string()),
        ];

        self.get("ItemList.aspx", params).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> CatalogResult<T> {
        let api_key = self.api_key.as_deref().ok_or(CatalogError::NotConfigured)?;

        let mut query: Vec<(&str, String)> = vec![
            ("ttbkey", api_key.to_string()),
            ("output", "js".to_string()),
            ("Version", API_VERSION.to_string()),
            ("SearchTarget", "Book".to_string()),
        ];
        query.extend(params);

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "Calling catalog API");

        let body: serde_json::Value = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(code) = body.get("errorCode") {
            let message = body
                .get("errorMessage")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            warn!(error_code = %code, error_message = message, "Catalog API returned an error");
            return Err(CatalogError::Upstream {
                reason: format!("API error {code}: {message}"),
            });
        }

        serde_json::from_value(body).map_err(|e| CatalogError::Decode {
            reason: e.to_string(),
        })
    }
}

fn clamp_max_results(max_results: u32) -> u32 {
    max_results.clamp(1, MAX_RESULTS_LIMIT)
}
