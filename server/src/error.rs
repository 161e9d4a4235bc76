//! HTTP rendering of service errors.
//!
//! # Design
//! Status codes are chosen from `ErrorKind` alone. `NotFound` and
//! `AlreadyExists` get dedicated, actionable responses; everything the
//! storage could not classify becomes a 500 carrying the tagged message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use todo_core::{ErrorKind, ServiceError};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub reason: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                ErrorKind::Cancelled => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Service(err) => match err.kind() {
                ErrorKind::NotFound => "TODO_NOT_FOUND",
                ErrorKind::AlreadyExists => "TODO_ALREADY_EXISTS",
                ErrorKind::Cancelled => "REQUEST_CANCELLED",
                ErrorKind::Internal => "INTERNAL",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::Service(err) => match err.kind() {
                ErrorKind::NotFound => "todo item not found".to_string(),
                ErrorKind::AlreadyExists => "todo item already exists in the system".to_string(),
                ErrorKind::Cancelled | ErrorKind::Internal => err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            reason: self.reason().to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
