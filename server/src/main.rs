use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_core::{InMemoryStorage, SqliteStorage, TodoStorage};
use todo_server::{AppState, Config, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_server=debug,todo_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let storage: Arc<dyn TodoStorage> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
        StorageBackend::Sqlite => Arc::new(
            SqliteStorage::connect(&config.database_url)
                .await
                .with_context(|| format!("opening {}", config.database_url))?,
        ),
    };
    tracing::info!(storage = ?config.storage, "storage ready");

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on {addr}");

    let app = todo_server::app(AppState::new(storage, config.request_timeout));
    todo_server::run(listener, app, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
