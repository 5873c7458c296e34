// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use tokio::sync::Mutex;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::formula_service::FormulaService;
use crate::application::navigation_service::NavigationService;
use crate::application::session::Session;
use crate::application::tag_store::TagStore;
use crate::infrastructure::config::{load_app_config, StoreSettings};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::memory_store::MemoryStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("process_trend=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create store (infrastructure layer)
    let store: Arc<dyn TagStore> = match config.store {
        StoreSettings::Influx(influx) => {
            tracing::info!("Using InfluxDB store at {}", influx.host);
            Arc::new(InfluxRepository::new(
                influx.host,
                influx.token,
                influx.database,
                influx.retention_policy,
                influx.measurement,
            ))
        }
        StoreSettings::Memory(memory) => match memory.seed_csv {
            Some(path) => {
                let store = tokio::task::spawn_blocking(move || MemoryStore::from_csv(path)).await??;
                Arc::new(store)
            }
            None => {
                tracing::warn!("Using an empty in-memory store");
                Arc::new(MemoryStore::new())
            }
        },
    };

    // Create services (application layer)
    let formula_service = FormulaService::new(store.clone());
    let navigation_service = NavigationService::new(store);

    // One session per process, starting at the wall clock
    let session = Session::new(chrono::Utc::now(), config.window.default_duration_minutes)?;

    let state = Arc::new(AppState {
        formula_service,
        navigation_service,
        session: Mutex::new(session),
    });

    // Build router (presentation layer)
    let app = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Starting process-trend service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
