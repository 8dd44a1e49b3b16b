/**
 * BREEZE KERNEL - Main entry point
 *
 * ROLE: Loads configuration, installs logging, builds the shared state and
 * serves the REST API until Ctrl-C.
 */

use anyhow::Context;
use breeze_kernel::{build_state, config::load_config, http::build_router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "breeze_kernel=info,tower_http=info".into()),
        )
        .init();

    let cfg = load_config().await.context("failed to load kernel config")?;
    tokio::fs::create_dir_all(&cfg.data_dir)
        .await
        .with_context(|| format!("failed to create data dir {}", cfg.data_dir.display()))?;
    info!(
        data_dir = %cfg.data_dir.display(),
        inactivity_timeout_secs = cfg.inactivity_timeout_secs,
        "kernel configured"
    );

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid bind address")?;
    let app = build_router(build_state(cfg));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("kernel stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
