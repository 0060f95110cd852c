//! Error handling foundation for authflow.
//!
//! This module provides the `Result` type alias using rootcause and the
//! `ApiError` returned by every platform collaborator. Each crate defines
//! its own domain-specific error types in their own error modules, using
//! rootcause's `.context()` to add layer-appropriate context as errors
//! propagate up the stack.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors returned by platform API collaborators.
///
/// Collaborator traits return this plain enum; callers branch on `code()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The platform answered with a coded error (gRPC status code).
    Status { code: i32, message: String },
    /// The requested resource does not exist.
    NotFound { resource: String },
    /// The request could not be delivered or the connection failed.
    Transport { details: String },
    /// The response body could not be decoded.
    Decode { details: String },
}

impl ApiError {
    /// Status code used by the platform for failed preconditions, e.g. an
    /// authorization request that was already finalized.
    pub const FAILED_PRECONDITION: i32 = 9;

    /// Returns the platform status code, if the error carries one.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::NotFound { .. } => Some(5),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { code, message } => {
                write!(f, "platform error (code {code}): {message}")
            }
            Self::NotFound { resource } => write!(f, "{resource} not found"),
            Self::Transport { details } => write!(f, "platform request failed: {details}"),
            Self::Decode { details } => write!(f, "invalid platform response: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}
