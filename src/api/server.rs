//! Router assembly and server lifecycle.

use axum::{
    Json, Router,
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::db::Database;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(str::trim) {
        None | Some("") | Some("*") => AllowOrigin::from(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Invalid CORS origin {:?}, allowing any origin", origin);
                AllowOrigin::from(Any)
            }
        },
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full `/api` router.
///
/// `cors_origin` restricts cross-origin requests to one origin; `None`
/// allows any.
pub fn build_router(state: AppState, cors_origin: Option<&str>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(super::projects::routes())
        .merge(super::villas::routes())
        .merge(super::categories::routes())
        .merge(super::tasks::routes())
        .merge(super::teams::routes());

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, then shut down gracefully.
pub async fn serve(db: Arc<Database>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(AppState::new(db), config.cors_origin.as_deref());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("API server shutting down");
        })
        .await?;

    Ok(())
}
