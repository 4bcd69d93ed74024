//! JSON envelope shared by every endpoint.
//!
//! Success: `{"success": true, "message": "...", "data": ...}`
//! Failure: `{"success": false, "error": "..."}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = Success { success: true, message: message.to_string(), data };
    (status, Json(body)).into_response()
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    success(StatusCode::OK, message, data)
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    success(StatusCode::CREATED, message, data)
}

pub fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(Failure { success: false, error: error.into() })).into_response()
}
