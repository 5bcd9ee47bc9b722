//! AppRoute Rotation Server
//!
//! This server provides:
//! - A watch-and-cache store over configured certificate/key files
//! - Automatic in-memory TLS bundle reload on rotation
//! - Health, readiness, and Prometheus metrics endpoints
//!
//! Usage:
//! ```bash
//! # With config file
//! approute-server --config config.yaml
//!
//! # Or with environment variables (they override the config file)
//! APPROUTE_PORT=9090 approute-server --config config.yaml
//! ```

mod config;
mod reload;

use clap::{Parser, Subcommand};
use config::OperatorConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use approute_core::RotationHandler;
use approute_observability::{HealthState, Metrics, ReadinessChecker, RecordedHandler, health_router};
use approute_store::FileStore;
use reload::{CertificateFiles, TlsReloader, run_event_pump};

/// AppRoute Rotation Server - certificate/secret rotation for the ingress add-on
#[derive(Parser)]
#[command(name = "approute-server")]
#[command(about = "AppRoute rotation server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "APPROUTE_CONFIG", global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the rotation server (default if no command specified)
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) | None => {
            // Continue with server startup (default behavior)
        }
    }

    // Load configuration
    let mut config = if let Some(config_path) = cli.config {
        OperatorConfig::from_file(&config_path)?
    } else {
        OperatorConfig::default()
    };

    // Merge environment variables (they override config file)
    config.merge_env();
    config.validate()?;

    // Initialize tracing with configured level
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::new(format!("{}", log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Initializing AppRoute rotation server");

    let token = CancellationToken::new();
    let store = Arc::new(FileStore::new(token.clone())?);

    let mut reloader = TlsReloader::new(Arc::clone(&store));
    for cert in &config.certificates {
        reloader.register(CertificateFiles {
            name: cert.name.clone(),
            cert_file: cert.cert_file.clone(),
            key_file: cert.key_file.clone(),
        })?;
    }
    let reloader = Arc::new(reloader);

    let metrics = Arc::new(Metrics::new()?);
    let handler: Arc<dyn RotationHandler> = Arc::new(RecordedHandler::new(
        Arc::clone(&reloader),
        Arc::clone(&metrics),
    ));

    let pump = tokio::spawn(run_event_pump(
        Arc::clone(&store),
        handler,
        Arc::clone(&metrics),
        token.clone(),
    ));

    // Health/metrics endpoints
    let health_state = HealthState::with_readiness_checker(
        Arc::clone(&metrics),
        Arc::clone(&reloader) as Arc<dyn ReadinessChecker>,
    );
    let app = health_router(health_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("AppRoute rotation server listening on http://{}", addr);
    info!("  - Health check:       http://{}/healthz", addr);
    info!("  - Readiness check:    http://{}/readyz", addr);
    info!("  - Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancelling the token shuts the store down and drains the pump.
    token.cancel();
    match pump.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("event pump exited with error: {e}"),
        Err(e) => warn!("event pump task failed: {e}"),
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
