//! HTTP error responses.

use authflow_continuation::{FlowError, FlowStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors returned by the login handlers.
#[derive(Debug)]
pub enum AppError {
    /// The flow reported a client or server error to show the caller.
    Rejected { status: FlowStatus, message: String },
    /// The flow failed unexpectedly.
    Flow { details: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, message } => {
                write!(f, "request rejected ({}): {}", status.code(), message)
            }
            Self::Flow { details } => write!(f, "login flow failed: {}", details),
        }
    }
}

impl std::error::Error for AppError {}

impl From<Report<FlowError>> for AppError {
    fn from(report: Report<FlowError>) -> Self {
        Self::Flow {
            details: report.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Rejected { status, message } => {
                let status = match status {
                    FlowStatus::BadRequest => StatusCode::BAD_REQUEST,
                    FlowStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, message)
            }
            Self::Flow { details } => {
                tracing::error!("Login flow failed: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
