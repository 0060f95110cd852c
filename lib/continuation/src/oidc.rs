//! The OIDC protocol layer.

use async_trait::async_trait;
use authflow_core::{ApiError, AuthRequestId, SessionId};

use crate::request::AuthorizationRequest;

/// The session that finalizes an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCallback {
    pub session_id: SessionId,
    pub session_token: String,
}

/// Result of finalizing an authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackResponse {
    /// Where to send the browser to complete the OIDC flow.
    pub callback_url: Option<String>,
}

impl CallbackResponse {
    /// Returns the non-empty callback URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.callback_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Access to pending OIDC authorization requests.
#[async_trait]
pub trait OidcBackend: Send + Sync {
    /// Loads a pending authorization request.
    async fn get_auth_request(&self, id: &AuthRequestId)
    -> Result<AuthorizationRequest, ApiError>;

    /// Finalizes the authorization request with a session.
    ///
    /// Fails with status code 9 if the request was already finalized.
    async fn create_callback(
        &self,
        id: &AuthRequestId,
        session: &SessionCallback,
    ) -> Result<CallbackResponse, ApiError>;
}
