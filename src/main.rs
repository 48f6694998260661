//! Librarian HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use librarian::catalog::CatalogClient;
use librarian::config::Config;
use librarian::embedding::TextEncoder;
use librarian::gateway::{HandlerState, create_router_with_state};
use librarian::recommend::RecommendationOrchestrator;
use librarian::store::BookStore;
use librarian::vectordb::QdrantClient;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        collection = %config.collection,
        "Librarian starting"
    );

    let encoder_config = config.encoder_config();
    if encoder_config.testing_stub {
        tracing::warn!("No LIBRARIAN_MODEL_PATH configured, running encoder in stub mode");
    }
    let encoder = tokio::task::spawn_blocking(move || TextEncoder::load(encoder_config)).await??;
    tracing::info!(
        embedding_dim = encoder.embedding_dim(),
        stub = encoder.is_stub(),
        "Encoder loaded"
    );

    let qdrant = Arc::new(QdrantClient::new(&config.qdrant_url, config.http_timeout())?);
    let store = Arc::new(BookStore::new(
        qdrant,
        config.collection.clone(),
        config.dim_config(),
    ));

    if store.ping().await {
        store.ensure_index().await?;
    } else {
        tracing::warn!(
            url = %config.qdrant_url,
            "Vector store unreachable at startup; the collection will be created on first use"
        );
    }

    let catalog = CatalogClient::new(config.aladin_api_key.clone(), config.http_timeout())?;
    if !catalog.is_configured() {
        tracing::warn!("No LIBRARIAN_ALADIN_API_KEY configured, catalog routes will return 503");
    }

    let orchestrator = RecommendationOrchestrator::new(Arc::new(encoder), Arc::clone(&store));
    orchestrator.check_dimensions()?;
    let state = HandlerState::new(orchestrator, Arc::new(catalog));
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close();
    tracing::info!("Librarian shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("LIBRARIAN_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
