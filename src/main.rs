use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talenthub::config::Config;
use talenthub::AppState;

#[derive(Parser, Debug)]
#[command(name = "talenthub")]
#[command(author, version, about = "Membership and content API for a youth-development NGO", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "talenthub.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TalentHub v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    std::fs::create_dir_all(&config.server.data_dir)?;
    std::fs::create_dir_all(&config.server.upload_dir)?;

    // Initialize database
    let db = talenthub::db::init(&config.server.data_dir).await?;

    // Ensure an admin account exists
    talenthub::db::seeders::ensure_admin_user(
        &db,
        &config.auth.admin_email,
        config.auth.admin_password.as_deref(),
    )
    .await?;

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), db)?);
    let app = talenthub::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
