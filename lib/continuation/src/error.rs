//! Errors raised while continuing an authorization request.

use std::fmt;

/// Result of routing, carrying a [`FlowError`] report on failure.
pub type FlowResult<T> = authflow_core::Result<T, FlowError>;

/// Failures that abort the routing of an authorization request.
///
/// Expected outcomes such as "no active session" are not errors; they are
/// returned as [`Decision::Error`](crate::Decision::Error).
#[derive(Debug)]
pub enum FlowError {
    /// The authorization request could not be loaded.
    AuthRequest {
        /// Error details.
        details: String,
    },
    /// The browser's sessions could not be loaded.
    Sessions {
        /// Error details.
        details: String,
    },
    /// The OIDC callback could not be created.
    Callback {
        /// Error details.
        details: String,
    },
    /// Login name continuation failed.
    LoginName {
        /// Error details.
        details: String,
    },
    /// Login settings could not be loaded.
    Settings {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthRequest { details } => {
                write!(f, "could not load auth request: {}", details)
            }
            Self::Sessions { details } => write!(f, "could not load sessions: {}", details),
            Self::Callback { details } => write!(f, "could not create callback: {}", details),
            Self::LoginName { details } => {
                write!(f, "could not continue with login name: {}", details)
            }
            Self::Settings { details } => {
                write!(f, "could not load login settings: {}", details)
            }
        }
    }
}

impl std::error::Error for FlowError {}
