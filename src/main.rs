//! AssetMarket - Application Entry Point

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetmarket::{
    config::{StoreBackend, CONFIG},
    create_router,
    db::{self, MemoryStore, PgStore, Store},
    services::{HttpNsfwDetector, HttpObjectStorage, ObjectStorage, StorageUploadPublisher, UploadWorker},
    state::AppState,
    utils::SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into());
    if CONFIG.server.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting AssetMarket server...");

    let store: Arc<dyn Store> = match CONFIG.database.backend {
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(&CONFIG.database).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let storage: Arc<dyn ObjectStorage> = Arc::new(HttpObjectStorage::new(&CONFIG.storage)?);
    let detector = Arc::new(HttpNsfwDetector::new(&CONFIG.nsfw)?);
    let clock = Arc::new(SystemClock);

    if CONFIG.scheduler.enabled {
        let publisher = Arc::new(StorageUploadPublisher::new(storage.clone()));
        UploadWorker::new(store.clone(), publisher, clock.clone(), &CONFIG.scheduler).spawn();
    } else {
        tracing::info!("Scheduled upload worker disabled");
    }

    let state = AppState::new(store, storage, detector, clock, CONFIG.clone());
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
