use axum::Json;

use crate::models::common::HealthResponse;

/// Handler for GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Server is running".to_string(),
    })
}
