// Main entry point for the registrar service

use registrar::aggregate::AggregationEngine;
use registrar::api::{create_router, AppState};
use registrar::auth::audit_logger::AuditLogger;
use registrar::auth::auth_middleware::AuthState;
use registrar::auth::credentials::CredentialStore;
use registrar::auth::token::TokenIssuer;
use registrar::config::Config;
use registrar::state::store::MemoryStore;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().map_err(|e| -> Box<dyn std::error::Error> {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1)
    })?;

    // 2. Initialize tracing subscriber with config values
    // Must be done only once - tracing panics if init() is called multiple times
    init_tracing(&config)?;

    info!("Starting registrar");

    info!(
        bind_address = %config.bind_address,
        port = config.port,
        "Configuration loaded"
    );

    // 3. Initialize the relational store
    let store = Arc::new(MemoryStore::new());
    info!("Relational store initialized");

    // 4. Initialize credential hashing
    let credentials = Arc::new(CredentialStore::new(config.bcrypt_cost));

    // 5. Initialize token issuer
    let tokens = Arc::new(TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        &config.jwt_issuer,
        &config.jwt_audience,
        config.token_ttl_minutes,
    ));

    // 6. Initialize aggregation engine over the same store
    let aggregator = Arc::new(AggregationEngine::new(store.clone()));

    // 7. Initialize audit logger
    let audit_logger = Arc::new(AuditLogger::new());

    // 8. Create AuthState
    let auth_state = Arc::new(AuthState {
        tokens: tokens.clone(),
        audit_logger,
    });

    // 9. Create AppState
    let app_state = AppState {
        store,
        credentials,
        tokens,
        aggregator,
        config: Arc::new(config.clone()),
    };

    // 10. Create router
    let router = create_router(app_state, Some(auth_state));

    info!("Router created");

    // 11. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind to address");
        e
    })?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = parse_log_level(&config.log_level)?;

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> Result<tracing::Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => Err(format!("Invalid log level: {}", level)),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
