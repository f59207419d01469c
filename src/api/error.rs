use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::model::ValidationErrors;
use crate::store::StoreError;

static DEVELOPMENT: AtomicBool = AtomicBool::new(false);

/// Switch error bodies to carry the debug representation of the error.
pub fn set_development_mode(enabled: bool) {
    DEVELOPMENT.store(enabled, Ordering::Relaxed);
}

pub fn is_development_mode() -> bool {
    DEVELOPMENT.load(Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Can't find a document with the requested id")]
    NotFound,

    #[error("Can't find {0} on the server!")]
    RouteNotFound(String),

    #[error("Invalid input data. {}.", .0.messages().join(". "))]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("You are not logged in! Please log in to get access.")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store(StoreError::Duplicate { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors raised on purpose, whose message is safe to show to the caller.
    fn is_operational(&self) -> bool {
        !self.status_code().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let development = is_development_mode();

        if status.is_server_error() {
            log::error!("{self:?}");
        }

        let message = if self.is_operational() || development {
            self.to_string()
        } else {
            "Something went wrong!".to_string()
        };

        let body = ErrorResponse {
            status: if status.is_client_error() { "fail" } else { "error" },
            message,
            error: development.then(|| format!("{self:?}")),
        };

        (status, Json(body)).into_response()
    }
}
