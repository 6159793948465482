use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{AppConfig, Environment, SecurityConfig};
use crate::database::{DatabaseManager, MemoryPortfolioStore, PgPortfolioStore, PortfolioStore};
use crate::handlers;
use crate::state::AppState;
use crate::views::SystemClock;

/// Build the full router for `state`
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(portfolio_routes())
        .with_state(state);

    let router = if config.security.enable_cors {
        router.layer(cors_layer(&config.security))
    } else {
        router
    };

    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn portfolio_routes() -> Router<AppState> {
    use handlers::{protected, public};

    Router::new()
        .route(
            "/api/portfolios",
            get(public::portfolio_list).post(protected::portfolio_create),
        )
        .route(
            "/api/portfolios/:id",
            get(public::portfolio_get).put(protected::portfolio_update),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Pick the store for this deployment
pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PortfolioStore>> {
    if config.database.url.is_some() {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        let store: Arc<dyn PortfolioStore> = Arc::new(PgPortfolioStore::new(pool));
        return Ok(store);
    }

    if matches!(config.environment, Environment::Development) {
        warn!("DATABASE_URL not set; using in-memory portfolio store");
        let store: Arc<dyn PortfolioStore> = Arc::new(MemoryPortfolioStore::new());
        return Ok(store);
    }

    anyhow::bail!("DATABASE_URL is required outside development")
}

/// Run the HTTP server until ctrl-c
pub async fn serve(config: &AppConfig, port: u16) -> anyhow::Result<()> {
    let store = build_store(config).await?;
    let state = AppState::new(store, Arc::new(SystemClock), config);
    info!("View gate scope: {:?}", state.views.gate_scope());

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Folio API listening on http://{}", bind_addr);

    axum::serve(listener, app(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Folio API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Folio API",
            "version": version,
            "description": "Portfolio hosting API with view accounting",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "portfolios": "GET /api/portfolios, GET /api/portfolios/:id (public, optional credential)",
                "portfolio_edit": "POST /api/portfolios, PUT /api/portfolios/:id (credential required)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
