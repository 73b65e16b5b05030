//! School endpoints
//!
//! - POST /schools - Register a school (multipart form, optional image)
//! - GET /schools - List every school, newest first

use super::submission::{read_submission, SchoolSubmission};
use super::AppState;
use crate::error::{GatewayError, Operation, Result};
use crate::school::SchoolSummary;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::multipart::MultipartRejection;
use axum_extra::extract::Multipart;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

// === Register School ===

#[derive(Serialize)]
pub struct CreateSchoolResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

pub async fn create_school(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let start_time = Instant::now();

    let mut multipart = multipart.map_err(|e| GatewayError::InvalidRequest {
        message: format!("Expected a multipart/form-data body: {}", e.body_text()),
    })?;

    let SchoolSubmission { form, image } = read_submission(&mut multipart, state.registry.assets())
        .await
        .map_err(|e| e.during(Operation::AddSchool))?;

    // A staged image is discarded when validation fails
    let school = form
        .validate()
        .map_err(|fields| GatewayError::Validation { fields })?;

    let id = state
        .registry
        .register(school, image)
        .await
        .map_err(|e| e.during(Operation::AddSchool))?;

    info!(
        "School {} created in {}ms",
        id,
        start_time.elapsed().as_millis()
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSchoolResponse {
            success: true,
            message: "School added successfully".to_string(),
            id,
        }),
    ))
}

// === List Schools ===

#[derive(Serialize)]
pub struct ListSchoolsResponse {
    pub success: bool,
    pub schools: Vec<SchoolSummary>,
}

pub async fn list_schools(State(state): State<AppState>) -> Result<Json<ListSchoolsResponse>> {
    let schools = state
        .registry
        .list()
        .await
        .map_err(|e| e.during(Operation::FetchSchools))?;

    Ok(Json(ListSchoolsResponse {
        success: true,
        schools,
    }))
}

pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}
