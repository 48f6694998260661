//! HTTP gateway (Axum) for book registration, recommendations and catalog search.
//!
//! This module is primarily used by the `librarian` server binary.

#![allow(missing_docs)]

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{
    catalog_bestsellers_handler, catalog_lookup_handler, catalog_search_handler,
    create_book_handler, delete_book_handler, get_book_handler, list_books_handler,
    recommend_by_book_handler, recommend_by_review_handler,
};
pub use state::HandlerState;

use crate::vectordb::VectorDbClient;

/// Response header carrying a short machine-readable outcome.
pub const LIBRARIAN_STATUS_HEADER: &str = "x-librarian-status";

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_READY: &str = "ready";
pub const STATUS_UNAVAILABLE: &str = "unavailable";

pub fn create_router_with_state<C: VectorDbClient + 'static>(state: HandlerState<C>) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<C>))
        .route(
            "/books",
            post(create_book_handler::<C>).get(list_books_handler::<C>),
        )
        .route(
            "/books/{id}",
            get(get_book_handler::<C>).delete(delete_book_handler::<C>),
        )
        .route(
            "/recommendations/by-review",
            post(recommend_by_review_handler::<C>),
        )
        .route(
            "/recommendations/by-book",
            post(recommend_by_book_handler::<C>),
        )
        .route("/catalog/search", get(catalog_search_handler::<C>))
        .route("/catalog/lookup/{isbn}", get(catalog_lookup_handler::<C>))
        .route(
            "/catalog/bestsellers",
            get(catalog_bestsellers_handler::<C>),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub vectordb: &'static str,
    pub embedder_mode: &'static str,
    pub embedding_dim: usize,
    pub catalog: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        LIBRARIAN_STATUS_HEADER,
        HeaderValue::from_static(STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Ready once the vector store answers. The catalog is optional and never blocks readiness.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
) -> Response {
    let vectordb_status = if state.orchestrator.store().ping().await {
        STATUS_READY
    } else {
        STATUS_UNAVAILABLE
    };

    let encoder = state.orchestrator.encoder();
    let embedder_mode = if encoder.is_stub() { "stub" } else { "real" };

    let catalog_status = if state.catalog.is_configured() {
        "configured"
    } else {
        "not_configured"
    };

    let components = ComponentStatus {
        http: STATUS_READY,
        vectordb: vectordb_status,
        embedder_mode,
        embedding_dim: encoder.embedding_dim(),
        catalog: catalog_status,
    };

    let is_ready = components.vectordb == STATUS_READY;

    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status_msg = if is_ready { "ok" } else { "pending" };

    let mut headers = HeaderMap::new();
    headers.insert(LIBRARIAN_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
