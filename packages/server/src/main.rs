use std::sync::Arc;
use std::time::Duration;

use lules_common::StorageBackend;
use lules_common::storage::ObjectStore;
use lules_common::storage::memory::MemoryObjectStore;
use lules_common::storage::s3_store::S3ObjectStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lules_server::cache::QueryCache;
use lules_server::config::AppConfig;
use lules_server::state::AppState;
use lules_server::{database, mail, seed, services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;

    info!("Connecting to database...");
    let db = database::init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::seed_plans(&db).await?;
    seed::ensure_indexes(&db).await?;

    let object_store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory object storage; uploads are lost on restart");
            Arc::new(MemoryObjectStore::new(config.storage.public_base_url.clone()))
        }
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(&config.storage)?),
    };
    let mailer = mail::build_mailer(&config.mail)?;

    let state = AppState {
        db,
        object_store,
        mailer,
        cache: Arc::new(QueryCache::new(config.cache.enabled)),
        config: config.clone(),
    };

    if let Some(secs) = config.cron.interval_secs {
        tokio::spawn(services::expiry::run_plan_expiry_scheduler(
            state.clone(),
            Duration::from_secs(secs.max(1)),
        ));
    }

    let app = lules_server::build_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
