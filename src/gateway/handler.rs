use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::catalog::{MAX_RESULTS_LIMIT, QueryType};
use crate::constants::DEFAULT_LIST_LIMIT;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::recommend::{
    BookCreateRequest, RecommendByBookRequest, RecommendByReviewRequest, RecommendationResult,
};
use crate::store::Book;
use crate::vectordb::VectorDbClient;

const DEFAULT_CATALOG_RESULTS: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ListBooksParams {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct CatalogSearchParams {
    pub query: String,
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default = "default_catalog_results")]
    pub max_results: u32,
    #[serde(default = "default_start")]
    pub start: u32,
}

#[derive(Debug, Deserialize)]
pub struct BestsellerParams {
    #[serde(default)]
    pub category_id: u32,
    #[serde(default = "default_catalog_results")]
    pub max_results: u32,
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn default_catalog_results() -> u32 {
    DEFAULT_CATALOG_RESULTS
}

fn default_start() -> u32 {
    1
}

/// Decodes a JSON body into `T`, reporting shape errors as `InvalidRequest`.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<T, GatewayError> {
    let Json(value) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    serde_json::from_value(value)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))
}

fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, GatewayError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))
}

fn validate_max_results(max_results: u32) -> Result<(), GatewayError> {
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(GatewayError::InvalidRequest(format!(
            "max_results must be between 1 and {}",
            MAX_RESULTS_LIMIT
        )));
    }
    Ok(())
}

#[instrument(skip(state, body))]
pub async fn create_book_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let request: BookCreateRequest = parse_body(body)?;

    state.orchestrator.store().ensure_available().await?;
    let book = state.orchestrator.register_book(request).await?;

    info!(id = %book.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)).into_response())
}

#[instrument(skip(state, query))]
pub async fn list_books_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    query: Result<Query<ListBooksParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, GatewayError> {
    let params = parse_query(query)?;
    if params.limit == 0 {
        return Err(GatewayError::InvalidRequest(
            "limit must be at least 1".to_string(),
        ));
    }

    let books = state.orchestrator.store().list_all(params.limit).await?;
    debug!(count = books.len(), "Listed books");

    Ok(Json(books.into_iter().map(Book::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_book_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, GatewayError> {
    let record = state
        .orchestrator
        .store()
        .fetch(&id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("book not found: {}", id)))?;

    Ok(Json(record.into()))
}

#[instrument(skip(state))]
pub async fn delete_book_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    let store = state.orchestrator.store();
    store.ensure_available().await?;

    if !store.delete(&id).await? {
        return Err(GatewayError::NotFound(format!("book not found: {}", id)));
    }

    info!(id = %id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn recommend_by_review_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Vec<RecommendationResult>>, GatewayError> {
    let request: RecommendByReviewRequest = parse_body(body)?;

    state.orchestrator.store().ensure_available().await?;
    let results = state
        .orchestrator
        .recommend_by_review(&request.review, request.top_k)
        .await?;

    if results.is_empty() {
        return Err(GatewayError::NoRecommendations(
            "no books to recommend yet; register some books first".to_string(),
        ));
    }

    Ok(Json(results))
}

#[instrument(skip(state, body))]
pub async fn recommend_by_book_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Vec<RecommendationResult>>, GatewayError> {
    let request: RecommendByBookRequest = parse_body(body)?;

    state.orchestrator.store().ensure_available().await?;
    let results = state
        .orchestrator
        .recommend_by_book(&request.book_id, request.top_k)
        .await?;

    if results.is_empty() {
        return Err(GatewayError::NoRecommendations(
            "no similar books found; register more books first".to_string(),
        ));
    }

    Ok(Json(results))
}

#[instrument(skip(state, query))]
pub async fn catalog_search_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    query: Result<Query<CatalogSearchParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let params = parse_query(query)?;

    if params.query.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "query must not be empty".to_string(),
        ));
    }
    validate_max_results(params.max_results)?;
    if params.start == 0 {
        return Err(GatewayError::InvalidRequest(
            "start must be at least 1".to_string(),
        ));
    }

    let page = state
        .catalog
        .search(
            &params.query,
            params.query_type,
            params.max_results,
            params.start,
        )
        .await?;

    Ok(Json(page).into_response())
}

#[instrument(skip(state))]
pub async fn catalog_lookup_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    Path(isbn): Path<String>,
) -> Result<Response, GatewayError> {
    let item = state
        .catalog
        .lookup(&isbn)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("no catalog entry for ISBN {}", isbn)))?;

    Ok(Json(item).into_response())
}

#[instrument(skip(state, query))]
pub async fn catalog_bestsellers_handler<C: VectorDbClient + 'static>(
    State(state): State<HandlerState<C>>,
    query: Result<Query<BestsellerParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let params = parse_query(query)?;
    validate_max_results(params.max_results)?;

    let page = state
        .catalog
        .bestsellers(params.category_id, params.max_results)
        .await?;

    Ok(Json(page).into_response())
}
