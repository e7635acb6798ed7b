//! Uniform error type for router handlers, mapped onto the HTTP status
//! codes named in the error-handling design: malformed ingress and bad
//! query parameters are 500s with a short body, missing/invalid auth is a
//! bodyless 401, storage failures are 500s.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Option<String>,
}

impl ApiError {
    pub fn bad_request(body: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, body: Some(body.into()) }
    }

    pub fn unauthorized() -> Self {
        ApiError { status: StatusCode::UNAUTHORIZED, body: None }
    }

    pub fn internal(body: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, body: Some(body.into()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, body).into_response(),
            None => self.status.into_response(),
        }
    }
}

impl From<crate::archive::ArchiveError> for ApiError {
    fn from(err: crate::archive::ArchiveError) -> Self {
        ApiError::internal(err.to_string())
    }
}
