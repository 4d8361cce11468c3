//! Liberis Server - Library Circulation & Holds Engine

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liberis_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("liberis_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Liberis Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.circulation.clone(),
        config.email.clone(),
    );

    // Spawn the periodic overdue/reminder sweeps
    if config.scheduler.enabled {
        let interval = Duration::from_secs(config.scheduler.sweep_interval_secs);
        services.scheduler.spawn_sweep_loop(interval);
        tracing::info!(
            interval_secs = config.scheduler.sweep_interval_secs,
            "Sweep scheduler started"
        );
    }

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Items (catalog)
        .route("/items", post(api::items::create_item))
        .route("/items/:id", get(api::items::get_item))
        // Users
        .route("/users", post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/loans", get(api::loans::get_user_loans))
        .route("/users/:id/fines", get(api::loans::get_user_fines))
        .route("/fines/:id/payments", post(api::loans::pay_fine))
        // Loans (circulation)
        .route("/loans", post(api::loans::issue_item))
        .route("/loans/:id/return", post(api::loans::return_item))
        .route("/items/:item_id/return/:user_id", post(api::loans::return_item_for_user))
        .route("/loans/:id/extend", post(api::loans::extend_due_date))
        .route("/loans/:id/renewals", post(api::loans::request_renewal))
        .route("/renewals/:id/approve", post(api::loans::approve_renewal))
        .route("/renewals/:id/reject", post(api::loans::reject_renewal))
        // Holds
        .route("/items/:id/queue", post(api::holds::join_queue))
        .route("/items/:id/queue", get(api::holds::list_queue))
        .route("/items/:id/queue/admit", post(api::holds::admit_next))
        .route("/items/:id/queue/allocate", post(api::holds::allocate_direct))
        .route("/queue/members/:id", delete(api::holds::withdraw))
        // Admin
        .route("/admin/sweeps/overdue", post(api::admin::run_overdue_sweep))
        .route("/admin/sweeps/reminders", post(api::admin::run_reminder_sweep))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
