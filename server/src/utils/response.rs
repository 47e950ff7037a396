use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::filter::{Page, Pagination};

/// Success envelope: `{success, data, message}`, plus `pagination` on listings.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn respond<T>(status: StatusCode, body: ApiResponse<T>) -> Response
where
    T: Serialize,
{
    (status, Json(body)).into_response()
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    respond(
        StatusCode::OK,
        ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            pagination: None,
        },
    )
}

/// 201 for newly stored resources.
pub fn created<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    respond(
        StatusCode::CREATED,
        ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            pagination: None,
        },
    )
}

pub fn paginated<T>(page: Page<T>, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    respond(
        StatusCode::OK,
        ApiResponse {
            success: true,
            data: Some(page.items),
            message: Some(message.into()),
            pagination: Some(page.pagination),
        },
    )
}

pub fn empty_success(message: impl Into<String>) -> Response {
    respond::<()>(
        StatusCode::OK,
        ApiResponse {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        },
    )
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}
