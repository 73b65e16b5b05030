use super::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database_connected: bool,
    upload_dir_writable: bool,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = state.registry.database_connected().await;
    let upload_dir_writable = state.registry.assets().ensure_root().await.is_ok();

    Json(HealthResponse {
        status: if database_connected && upload_dir_writable {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        database_connected,
        upload_dir_writable,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
