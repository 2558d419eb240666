use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Liveness payload. Field order is part of the wire contract.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
}

pub const HEALTHY: HealthStatus = HealthStatus {
    status: "OK",
    message: "service is running",
};

/// Process liveness only; never consults the database.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HEALTHY))
}
