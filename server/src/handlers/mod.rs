use axum::response::Response;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod accounts;
pub mod admin;
pub mod events;
pub mod functions;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "progdealer-api",
    };

    success(payload, "Health check successful")
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
