use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::recommend::RecommendError;
use crate::store::StoreError;

use super::LIBRARIAN_STATUS_HEADER;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NoRecommendations(String),

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("catalog API key is not configured")]
    CatalogNotConfigured,

    #[error("catalog request failed: {0}")]
    CatalogFailed(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { message } => GatewayError::StoreUnavailable(message),
            other => GatewayError::StorageError(other.to_string()),
        }
    }
}

impl From<RecommendError> for GatewayError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::InvalidRequest { reason } => GatewayError::InvalidRequest(reason),
            RecommendError::ReferenceNotFound { id } => {
                GatewayError::NotFound(format!("book not found: {id}"))
            }
            RecommendError::Store(e) => e.into(),
            RecommendError::Encoding(e) => GatewayError::EmbeddingFailed(e.to_string()),
            RecommendError::Internal { reason } => GatewayError::InternalError(reason),
        }
    }
}

impl From<CatalogError> for GatewayError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotConfigured => GatewayError::CatalogNotConfigured,
            other => GatewayError::CatalogFailed(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, librarian_status) = match &self {
            GatewayError::InvalidRequest(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request")
            }
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            GatewayError::NoRecommendations(_) => (StatusCode::NOT_FOUND, "no_recommendations"),
            GatewayError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            GatewayError::StorageError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            GatewayError::EmbeddingFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error")
            }
            GatewayError::CatalogNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "catalog_not_configured")
            }
            GatewayError::CatalogFailed(_) => (StatusCode::BAD_GATEWAY, "catalog_error"),
            GatewayError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            LIBRARIAN_STATUS_HEADER,
            HeaderValue::from_static(librarian_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
