use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dedupe_core::validator::SemanticValidator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dedupe_api::config::ServerConfig;
use dedupe_api::router::build_app_router;
use dedupe_api::state::AppState;
use dedupe_api::validator::HttpSemanticValidator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dedupe_api=debug,dedupe_db=info,dedupe_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        persist_threshold = config.dedup.persist_threshold,
        name_blocking = ?config.dedup.name_blocking,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = dedupe_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    dedupe_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    dedupe_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Semantic validator ---
    let validator: Option<Arc<dyn SemanticValidator>> = match &config.semantic_validator_url {
        Some(url) => {
            let client: Arc<dyn SemanticValidator> = Arc::new(
                HttpSemanticValidator::new(url.clone(), config.dedup.validator_timeout)
                    .expect("Failed to build semantic validator HTTP client"),
            );
            tracing::info!(url = %url, "Semantic validator configured");
            Some(client)
        }
        None => {
            tracing::info!("No semantic validator configured; scans use algorithmic scores");
            None
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(dedupe_events::EventBus::default());
    let persistence_handle = tokio::spawn(dedupe_events::AuditPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));
    tracing::info!("Audit persistence started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        validator,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router held the remaining bus handles; dropping ours closes the
    // channel once in-flight events drain.
    tracing::info!("Server stopped accepting connections, flushing audit events");
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
