use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;

/// A service error paired with the HTTP status it is answered with
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: ServiceError,
}

impl ApiError {
    pub fn validation(message: &str) -> Self {
        ServiceError::Validation(message.to_string()).into()
    }

    /// Answer `AccountNotFound` with 400, as the profile endpoints do
    pub fn account_missing_as_bad_request(self) -> Self {
        match self.error {
            ServiceError::AccountNotFound => Self {
                status: StatusCode::BAD_REQUEST,
                error: self.error,
            },
            _ => self,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        let status = match &error {
            ServiceError::Validation(_)
            | ServiceError::EmailAlreadyExists
            | ServiceError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::AccountNotFound | ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Timeout | ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.error);
        }
        let body = json!({
            "error": self.error.to_string(),
            "code": self.error.code(),
        });
        (self.status, Json(body)).into_response()
    }
}
