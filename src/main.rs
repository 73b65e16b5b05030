use school_directory::api::{router, AppState};
use school_directory::config::Config;
use school_directory::pool::PoolManager;
use school_directory::registry::{AssetStore, PgSchoolRepository, SchoolRegistry};

use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    let dotenv_result = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;
    let socket_addr = config.socket_addr()?;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).unwrap_or_else(|e| {
        eprintln!(
            "Warning: Could not create log directory {}: {}",
            config.log_dir.display(),
            e
        );
    });

    // Create file appender with daily rotation
    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "school-directory.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,school_directory=debug")),
        )
        // Console output
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        // File output with JSON format for easy parsing
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!(
        "Logging initialized - log directory: {}",
        config.log_dir.display()
    );

    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    info!("Starting school directory on {}", socket_addr);
    info!("Max pooled connections: {}", config.pool_max_size);
    info!(
        "Upload directory: {} (served at {})",
        config.upload_dir.display(),
        config.upload_url_prefix
    );
    info!(
        "Max image size: {} bytes, max body size: {} bytes",
        config.max_image_bytes, config.max_body_bytes
    );

    // Connect and make sure the schools table exists
    let pool_manager = Arc::new(PoolManager::new(&config).await?);
    let repository = PgSchoolRepository::new(pool_manager.clone());
    repository.ensure_schema().await?;

    let assets = AssetStore::new(
        &config.upload_dir,
        &config.upload_url_prefix,
        config.max_image_bytes,
    );
    assets.ensure_root().await?;

    let registry = Arc::new(SchoolRegistry::new(Arc::new(repository), assets));
    let app = router(AppState::new(registry), &config);

    // Create listener
    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        "Server shutdown complete ({} pooled connections idle)",
        pool_manager.available_connections()
    );

    Ok(())
}

async fn shutdown_signal() {
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

    info!("Received shutdown signal");
}
