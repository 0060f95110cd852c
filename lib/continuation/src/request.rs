//! Pending OIDC authorization requests.

use authflow_core::{AuthRequestId, UserId};
use authflow_session::SelectionHints;
use serde::{Deserialize, Serialize};

/// OIDC `prompt` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prompt {
    /// Silent authentication: no page may be shown.
    None,
    /// Re-authentication is mandatory.
    Login,
    /// Consent must be asked. Carried but not routed on.
    Consent,
    /// The user must choose an account.
    SelectAccount,
    /// The user wants to register.
    Create,
}

/// A pending authorization attempt created by the OIDC layer.
///
/// Read-only within the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub id: AuthRequestId,
    pub prompt: Vec<Prompt>,
    pub login_hint: Option<String>,
    pub hint_user_id: Option<UserId>,
    pub scope: Vec<String>,
}

impl AuthorizationRequest {
    /// Creates a request without prompts, hints or scopes.
    #[must_use]
    pub fn new(id: impl Into<AuthRequestId>) -> Self {
        Self {
            id: id.into(),
            prompt: Vec::new(),
            login_hint: None,
            hint_user_id: None,
            scope: Vec::new(),
        }
    }

    /// Adds a prompt value.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        if !self.prompt.contains(&prompt) {
            self.prompt.push(prompt);
        }
        self
    }

    /// Sets the login name hint. Empty hints are ignored.
    #[must_use]
    pub fn with_login_hint(mut self, hint: impl Into<String>) -> Self {
        self.login_hint = Some(hint.into()).filter(|h| !h.is_empty());
        self
    }

    /// Sets the explicit user hint.
    #[must_use]
    pub fn with_hint_user_id(mut self, user_id: impl Into<UserId>) -> Self {
        self.hint_user_id = Some(user_id.into()).filter(|id| !id.as_str().is_empty());
        self
    }

    /// Adds a scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope.push(scope.into());
        self
    }

    /// Returns true if the request carries the prompt value.
    #[must_use]
    pub fn has_prompt(&self, prompt: Prompt) -> bool {
        self.prompt.contains(&prompt)
    }

    /// Returns the non-empty login hint.
    #[must_use]
    pub fn login_hint(&self) -> Option<&str> {
        self.login_hint.as_deref().filter(|h| !h.is_empty())
    }

    /// Returns the identity hints used to filter sessions.
    #[must_use]
    pub fn selection_hints(&self) -> SelectionHints<'_> {
        SelectionHints {
            user_id: self.hint_user_id.as_ref().filter(|id| !id.as_str().is_empty()),
            login_name: self.login_hint(),
        }
    }
}
