use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use stockflow_core::{OrderError, StoreError, ValidationError};
use thiserror::Error;

const VALIDATION_TITLE: &str = "One or more validation errors occurred.";

/// Validation-problem body: `{"title", "status", "errors": {"<Key>": [..]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ProblemDetails {
    pub fn new(status: StatusCode) -> Self {
        let title = if status == StatusCode::BAD_REQUEST {
            VALIDATION_TITLE.to_owned()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Error")
                .to_owned()
        };
        Self {
            title,
            status: status.as_u16(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_error(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.entry(key.into()).or_default().push(message.into());
        self
    }
}

/// Handler error for both services.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    MalformedBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Order(error) => StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Validation(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn problem(&self) -> ProblemDetails {
        let problem = ProblemDetails::new(self.status());
        match self {
            Self::Order(OrderError::Validation(error)) | Self::Validation(error) => {
                problem.with_error(error.field(), error.to_string())
            }
            Self::Order(error) => problem.with_error(error.code(), error.to_string()),
            Self::MalformedBody(message) => problem.with_error("Body", message.clone()),
            Self::Store(StoreError::Backend(_)) => problem,
            Self::Store(StoreError::NotFound(_)) | Self::NotFound(_) => problem,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(self.problem())).into_response()
    }
}
