mod health;
mod schools;
mod submission;

pub use health::health_check;
pub use schools::{create_school, list_schools, method_not_allowed};

use crate::config::Config;
use crate::registry::SchoolRegistry;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state for all endpoints
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SchoolRegistry>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: Arc<SchoolRegistry>) -> Self {
        Self {
            registry,
            started_at: Instant::now(),
        }
    }
}

/// Build the HTTP surface.
///
/// - GET/POST /schools - list and register schools
/// - GET/POST /api/schools - same handlers under the web client's original path
/// - GET {upload_url_prefix}/* - stored images
/// - GET /health
pub fn router(state: AppState, config: &Config) -> Router {
    let schools = get(list_schools)
        .post(create_school)
        .fallback(method_not_allowed);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/schools", schools.clone())
        .route("/api/schools", schools)
        .nest_service(&config.upload_url_prefix, ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors_layer(&config.cors_allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    )
}
