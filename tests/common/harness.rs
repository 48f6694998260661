//! Test server harness.

use librarian::catalog::CatalogClient;
use librarian::constants::DimConfig;
use librarian::embedding::{EncoderConfig, TextEncoder};
use librarian::gateway::{HandlerState, create_router_with_state};
use librarian::recommend::RecommendationOrchestrator;
use librarian::store::BookStore;
use librarian::vectordb::MockVectorDbClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
const TEST_COLLECTION_NAME: &str = "librarian_test_books";

pub const TEST_EMBEDDING_DIM: usize = 1024;

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub embedding_dim: usize,
    pub catalog_base_url: Option<String>,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            embedding_dim: TEST_EMBEDDING_DIM,
            catalog_base_url: None,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub vectordb: Arc<MockVectorDbClient>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Builds a stub-encoder orchestrator over an in-memory engine, collection ready.
pub async fn in_memory_orchestrator(
    embedding_dim: usize,
) -> Result<
    (
        Arc<MockVectorDbClient>,
        RecommendationOrchestrator<MockVectorDbClient>,
    ),
    ServerStartupError,
> {
    let encoder = TextEncoder::load(EncoderConfig::stub().with_embedding_dim(embedding_dim))
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let vectordb = Arc::new(MockVectorDbClient::new());
    let store = Arc::new(BookStore::new(
        Arc::clone(&vectordb),
        TEST_COLLECTION_NAME,
        DimConfig::new(embedding_dim),
    ));
    store
        .ensure_index()
        .await
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    Ok((
        vectordb,
        RecommendationOrchestrator::new(Arc::new(encoder), store),
    ))
}

/// Spawns a server with every external dependency replaced:
/// - **Vector database**: `MockVectorDbClient` (in-memory, no Qdrant required)
/// - **Encoder**: stub encoder (deterministic, fast)
/// - **Catalog**: unconfigured unless `catalog_base_url` points at a fake
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let (vectordb, orchestrator) = in_memory_orchestrator(config.embedding_dim).await?;

    let catalog = match config.catalog_base_url {
        Some(base_url) => CatalogClient::new(Some("test-key".to_string()), Duration::from_secs(5))
            .map(|c| c.with_base_url(base_url)),
        None => CatalogClient::new(None, Duration::from_secs(5)),
    }
    .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let state = HandlerState::new(orchestrator, Arc::new(catalog));
    let app = create_router_with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        vectordb,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
