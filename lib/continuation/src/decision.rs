//! Routing decisions and the login pages they point to.

use authflow_core::{AuthRequestId, OrganizationId};
use serde::Serialize;
use std::fmt;
use url::form_urlencoded;

/// HTTP status class of a terminal routing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowStatus {
    /// The request cannot be satisfied as asked (400).
    BadRequest,
    /// The request is malformed or processing failed (500).
    InternalError,
}

impl FlowStatus {
    /// Returns the HTTP status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InternalError => 500,
        }
    }
}

/// The outcome of routing an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send the browser to a login page or an external URL.
    ///
    /// Login pages are relative to the application's base path; external
    /// URLs are absolute.
    Redirect { location: String },
    /// Report an error to the caller.
    Error { status: FlowStatus, message: String },
}

impl Decision {
    /// Creates a redirect.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    /// Creates a 400 error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Error {
            status: FlowStatus::BadRequest,
            message: message.into(),
        }
    }

    /// Creates a 500 error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Error {
            status: FlowStatus::InternalError,
            message: message.into(),
        }
    }

    /// Returns the redirect target, if this is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location } => Some(location),
            Self::Error { .. } => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect { location } => write!(f, "redirect to {}", location),
            Self::Error { status, message } => write!(f, "error {}: {}", status.code(), message),
        }
    }
}

/// Builds a login page path with a query string.
///
/// Pairs are appended in order; `None` values are skipped.
#[must_use]
pub fn page_url(path: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(value) = value {
            query.append_pair(key, value);
        }
    }
    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// The login name entry page.
///
/// With a login hint the page submits the name right away.
#[must_use]
pub fn loginname_page(
    auth_request_id: &AuthRequestId,
    login_hint: Option<&str>,
    submit: bool,
    organization: Option<&OrganizationId>,
) -> String {
    let submit = (submit && login_hint.is_some()).then_some("true");
    page_url(
        "/loginname",
        &[
            ("authRequestId", Some(auth_request_id.as_str())),
            ("loginName", login_hint),
            ("submit", submit),
            ("organization", organization.map(OrganizationId::as_str)),
        ],
    )
}

/// The account picker.
#[must_use]
pub fn accounts_page(
    auth_request_id: &AuthRequestId,
    organization: Option<&OrganizationId>,
) -> String {
    page_url(
        "/accounts",
        &[
            ("authRequestId", Some(auth_request_id.as_str())),
            ("organization", organization.map(OrganizationId::as_str)),
        ],
    )
}

/// The registration page.
#[must_use]
pub fn register_page(
    auth_request_id: &AuthRequestId,
    organization: Option<&OrganizationId>,
) -> String {
    page_url(
        "/register",
        &[
            ("authRequestId", Some(auth_request_id.as_str())),
            ("organization", organization.map(OrganizationId::as_str)),
        ],
    )
}

/// The page confirming a completed sign-in.
#[must_use]
pub fn signedin_page(login_name: &str, organization: &OrganizationId) -> String {
    page_url(
        "/signedin",
        &[
            ("loginName", Some(login_name)),
            ("organization", Some(organization.as_str())),
        ],
    )
}
