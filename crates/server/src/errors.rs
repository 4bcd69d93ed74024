use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use service::errors::ServiceError;
use tracing::error;

use crate::response;

const INTERNAL_MESSAGE: &str = "internal error while processing the request";
const UPSTREAM_MESSAGE: &str = "products service unavailable";

/// Handler error: a service failure rendered with the status its kind maps to.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::InvalidInput(_) | ServiceError::Model(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) | ServiceError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::DuplicateKey(_) | ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self { Self(e) }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self { Self(ServiceError::InvalidInput(e.body_text())) }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self { Self(ServiceError::InvalidInput(e.body_text())) }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self { Self(ServiceError::InvalidInput(e.body_text())) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self.0 {
            ServiceError::Storage(_) => {
                error!(kind = self.0.kind(), error = %self.0, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            ServiceError::Upstream(_) => {
                error!(kind = self.0.kind(), error = %self.0, "request failed");
                UPSTREAM_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        response::failure(status, msg)
    }
}
