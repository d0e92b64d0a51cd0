mod api;
mod state;

use anyhow::Context;
use axum::Router;
use knox_core::{KnoxConfig, PipelineDriver, QueueDirectory};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knox_core=info,knox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = KnoxConfig::from_env().context("Invalid configuration")?;

    let queue = QueueDirectory::new(config.queue_dir.clone());
    queue.ensure_exists().await?;
    tokio::fs::create_dir_all(config.rejected_dir()).await?;

    let driver = PipelineDriver::from_config(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver_task = tokio::spawn(async move { driver.run(shutdown_rx).await });

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(queue));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Accepting documents on http://{}", config.listen_addr);

    let mut server_shutdown = shutdown_tx.subscribe();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down, finishing the current document");
    let _ = shutdown_tx.send(true);

    if let Err(e) = server.await? {
        tracing::error!("Ingestion service error: {}", e);
    }
    driver_task.await??;

    Ok(())
}
