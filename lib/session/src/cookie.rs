//! The browser's session cookie.
//!
//! The login application keeps every session it created for the browser in a
//! single cookie holding a JSON array. Each entry correlates a session ID with
//! the bearer token needed to hand that session to the OIDC layer.

use authflow_core::{AuthRequestId, OrganizationId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default name of the cookie holding the session list.
pub const SESSIONS_COOKIE: &str = "sessions";

/// One session entry of the sessions cookie.
///
/// Timestamps are milliseconds since the epoch, encoded as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub id: SessionId,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationId>,
    #[serde(default)]
    pub creation_ts: String,
    #[serde(default)]
    pub expiration_ts: String,
    #[serde(default)]
    pub change_ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<AuthRequestId>,
}

impl SessionCookie {
    /// Creates a cookie entry with the given ID and token.
    #[must_use]
    pub fn new(id: impl Into<SessionId>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
            login_name: String::new(),
            organization: None,
            creation_ts: String::new(),
            expiration_ts: String::new(),
            change_ts: String::new(),
            request_id: None,
        }
    }

    /// Returns the session token if one is present.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|t| !t.is_empty())
    }

    /// Returns true if the entry can be handed to the OIDC callback.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.id.as_str().is_empty() && self.token().is_some()
    }

    /// Returns when the entry expires, if the timestamp is readable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_millis(&self.expiration_ts)
    }
}

fn parse_millis(value: &str) -> Option<DateTime<Utc>> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Errors from decoding the sessions cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// The cookie value is not a JSON array of session entries.
    Malformed { reason: String },
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed sessions cookie: {reason}"),
        }
    }
}

impl std::error::Error for CookieError {}

/// The decoded list of session entries held by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(Vec<SessionCookie>);

impl SessionCookies {
    /// Creates the list from entries.
    #[must_use]
    pub fn new(entries: Vec<SessionCookie>) -> Self {
        Self(entries)
    }

    /// Decodes a raw cookie value.
    ///
    /// Accepts plain JSON as well as percent-encoded JSON. An empty value
    /// decodes to an empty list.
    ///
    /// # Errors
    ///
    /// Returns `CookieError::Malformed` if the value is not a JSON array of
    /// session entries.
    pub fn parse(raw: &str) -> Result<Self, CookieError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let decoded = if raw.starts_with('[') {
            std::borrow::Cow::Borrowed(raw)
        } else {
            urlencoding::decode(raw).map_err(|e| CookieError::Malformed {
                reason: e.to_string(),
            })?
        };

        serde_json::from_str(&decoded).map_err(|e| CookieError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Returns all entries.
    #[must_use]
    pub fn entries(&self) -> &[SessionCookie] {
        &self.0
    }

    /// Returns true if the browser holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the session IDs in cookie order.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.0.iter().map(|c| c.id.clone()).collect()
    }

    /// Finds the entry for a session.
    #[must_use]
    pub fn find(&self, id: &SessionId) -> Option<&SessionCookie> {
        self.0.iter().find(|c| &c.id == id)
    }

    /// Finds the entry for a session that can be handed to the OIDC
    /// callback (has both ID and token).
    #[must_use]
    pub fn find_usable(&self, id: &SessionId) -> Option<&SessionCookie> {
        self.find(id).filter(|c| c.is_usable())
    }

    /// Drops entries whose expiration timestamp lies before `now`.
    ///
    /// Entries without a readable expiration timestamp are kept.
    #[must_use]
    pub fn without_expired(self, now: DateTime<Utc>) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|c| c.expires_at().is_none_or(|expires| expires >= now))
                .collect(),
        )
    }
}

impl From<Vec<SessionCookie>> for SessionCookies {
    fn from(entries: Vec<SessionCookie>) -> Self {
        Self(entries)
    }
}
