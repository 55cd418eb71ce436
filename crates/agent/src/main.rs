use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use agent::client::HttpApihubClient;
use agent::config::AgentConfig;
use agent::platform::kube::KubePlatformService;
use agent::platform::stub::StubPlatformService;
use agent::platform::PlatformService;
use agent::security::AuthManager;
use agent::state::AppState;
use agent::web::build_router;

#[tokio::main]
async fn main() -> Result<()> {
    // Phase 1: Basic tracing so we can log during config loading
    // Uses set_default (thread-local) so it can be replaced by Phase 2's global subscriber
    let _basic_tracing = init_tracing_basic();

    info!("Starting APIHUB Discovery Agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    // Phase 2: Re-initialize tracing with config (level, optional file output)
    drop(_basic_tracing);
    init_tracing_from_config(&config);

    config.print();

    let platform: Arc<dyn PlatformService> = if config.stub_pm {
        warn!("STUB_PM is set, cluster API is stubbed out");
        Arc::new(StubPlatformService)
    } else {
        Arc::new(
            KubePlatformService::new()
                .await
                .context("Can't create platform client")?,
        )
    };

    let apihub = Arc::new(HttpApihubClient::new(
        config.apihub_url.clone(),
        config.apihub_access_token.clone(),
    ));

    let auth = Arc::new(
        AuthManager::setup(apihub.clone())
            .await
            .context("Failed to set up authentication")?,
    );
    info!("Authentication configured");

    let state = AppState::new(config.clone(), platform, apihub, auth);
    state.start_background_tasks();

    let app = build_router(state);

    let addr = config.listen_addr().context("Invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listen addr = {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Phase 1: Basic tracing init so we can log during config loading.
/// Uses RUST_LOG env var or a sensible default.
fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: Re-initialize tracing with configuration values.
fn init_tracing_from_config(config: &AgentConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Prefer RUST_LOG env var, fall back to LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_file_path.is_empty() {
        let layer = fmt::layer().with_target(true).with_thread_ids(false);
        tracing_subscriber::registry().with(filter).with(layer).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file_path)
            .unwrap_or_else(|e| panic!("Failed to open log file '{}': {}", config.log_file_path, e));
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(false)
            .with_writer(std::sync::Arc::new(file));
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
