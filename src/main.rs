use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodgate::config::FloodgateConfig;
use floodgate::server::{build_router, HttpServer};

/// Fixed-window rate limiting HTTP server.
#[derive(Debug, Parser)]
#[command(name = "floodgate", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Floodgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = FloodgateConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.http_addr = listen;
    }
    info!(
        http_addr = %config.server.http_addr,
        default_rate = %config.rate_limiting.default_rate,
        global_rate = %config.rate_limiting.effective_global_rate(),
        "Configuration loaded"
    );

    // Initialize the rate limiter
    let rate_limiter = Arc::new(config.rate_limiting.build_limiter().await?);
    info!("Rate limiter initialized");

    let router = build_router(&config.rate_limiting, rate_limiter);
    let server = HttpServer::new(config.server.http_addr, router);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Floodgate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
