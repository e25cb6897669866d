//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! Builds the Axum router, applies middleware layers, and starts the HTTP
//! server. All shared state travels through [`AppState`]; nothing realtime
//! is global, so tests can build isolated routers.

// region: --- Imports
use crate::bot::BotReplier;
use crate::handlers;
use crate::middleware::{log_requests, require_auth, stamp_req};
use crate::realtime::{ws_handler, Fanout};
use axum::{
    routing::{get, post, put},
    Router,
};
use lib_core::config::init_config;
use lib_core::{create_pool, Config, DbPool};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub fanout: Fanout,
    pub bot: Arc<BotReplier>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let fanout = Fanout::new();
        let bot = BotReplier::new(db.clone(), fanout.clone());
        Self {
            db,
            config,
            fanout,
            bot,
        }
    }
}

impl axum::extract::FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration.
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3001")
    pub bind_address: String,
    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,
    /// Database migrations path
    pub migrations_path: &'static str,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            migrations_path: "./migrations",
        }
    }
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize and start the HTTP server.
///
/// # Errors
///
/// Returns an error if configuration loading, database setup, migrations,
/// or socket binding fail.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("MESSAGING BACKEND STARTING");

    dotenvy::dotenv().ok();

    info!("Loading configuration...");
    init_config().map_err(|e| anyhow::anyhow!(e))?;
    let app_config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    app_config.validate().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure the data directory exists for SQLite
    if let Some(db_path) = app_config.database_url.strip_prefix("sqlite:") {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {:?}", parent);
            }
        }
    }

    info!("Connecting to database...");
    let pool = create_pool().await?;

    info!("Running database migrations from: {}", config.migrations_path);
    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(config.migrations_path)).await?;
    migrator.run(&pool).await?;
    info!("Migrations complete");

    let state = AppState::new(pool, app_config);
    let app = create_router(state, config.allowed_origins.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    info!("SERVER READY: http://{}", config.bind_address);
    log_server_info();

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the main application router with all routes.
pub fn create_router(state: AppState, allowed_origins: Vec<String>) -> Router {
    use axum::http::{HeaderValue, Method};

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    // Routes behind JWT auth
    let protected = Router::new()
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route(
            "/api/users/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route("/api/users/{username}", get(handlers::users::get_by_username))
        .route(
            "/api/conversations",
            post(handlers::conversations::create).get(handlers::conversations::list),
        )
        .route(
            "/api/conversations/{id}",
            get(handlers::conversations::get)
                .put(handlers::conversations::rename)
                .delete(handlers::conversations::delete),
        )
        .route(
            "/api/conversations/{id}/participants",
            post(handlers::conversations::add_participant),
        )
        .route(
            "/api/conversations/{id}/participants/{user_id}",
            axum::routing::delete(handlers::conversations::remove_participant),
        )
        .route("/api/conversations/{id}/leave", post(handlers::conversations::leave))
        .route("/api/conversations/{id}/read", put(handlers::conversations::mark_read))
        .route(
            "/api/conversations/{id}/messages",
            post(handlers::messages::send).get(handlers::messages::list),
        )
        .route("/api/messages/{id}/read", put(handlers::messages::mark_read))
        .route("/api/messages/{id}", axum::routing::delete(handlers::messages::delete))
        .layer(axum::middleware::from_fn(require_auth));

    Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/password/forgot", post(handlers::auth::forgot_password))
        .route("/api/auth/password/reset", post(handlers::auth::reset_password))
        // WebSocket authenticates itself via query token, inside the handler
        .route("/api/ws", get(ws_handler))
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<crate::middleware::mw_req_stamp::RequestStamp>()
                        .map(|s| s.id.clone())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                },
            ),
        )
        .layer(axum::middleware::from_fn(log_requests))
        // Outermost so every inner layer sees the request ID
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(cors)
}

fn log_server_info() {
    info!("AUTH:");
    info!("   POST /api/auth/register");
    info!("   POST /api/auth/login");
    info!("   GET  /api/auth/verify");
    info!("   POST /api/auth/password/forgot");
    info!("   POST /api/auth/password/reset");
    info!("USERS:");
    info!("   GET  /api/users/me");
    info!("   PUT  /api/users/me");
    info!("   GET  /api/users/{{username}}");
    info!("CONVERSATIONS:");
    info!("   POST /api/conversations");
    info!("   GET  /api/conversations");
    info!("   GET  /api/conversations/{{id}}");
    info!("   PUT  /api/conversations/{{id}}/read");
    info!("   POST /api/conversations/{{id}}/messages");
    info!("REALTIME:");
    info!("   GET  /api/ws?token={{jwt}}");
    info!("HEALTH:");
    info!("   GET  /health");
}
// endregion: --- Server Setup
