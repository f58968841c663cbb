#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::net::SocketAddr;
use std::sync::Arc;

use args::Args;
use clap::Parser;
use murmur_config::Config;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // A missing config file at the default path just means defaults
    let config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        tracing::info!(
            config_path = %args.config.display(),
            "no configuration file found, using defaults"
        );
        Config::default()
    };

    let listen: SocketAddr = if let Some(addr) = args.listen.or(config.server.listen_address) {
        addr
    } else {
        DEFAULT_LISTEN.parse()?
    };

    tracing::info!(config_path = %args.config.display(), %listen, "starting murmur");

    let server = tts::build_server(&config)?;

    // Prime the voice catalog in the background so the first request
    // doesn't pay for it
    let warmup = Arc::clone(&server);
    tokio::spawn(async move { warmup.warmup().await });

    let app = tts::endpoint_router()
        .with_state(server)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http());

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("murmur stopped");
    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
