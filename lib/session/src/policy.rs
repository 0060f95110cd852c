//! Login policy and registered authentication methods.

use async_trait::async_trait;
use authflow_core::{ApiError, OrganizationId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Authentication method types a user can have registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMethodType {
    Password,
    Passkey,
    Idp,
    Totp,
    U2f,
    OtpSms,
    OtpEmail,
}

impl AuthMethodType {
    /// Returns true for methods that act as a second factor.
    #[must_use]
    pub fn is_second_factor(self) -> bool {
        matches!(self, Self::Totp | Self::U2f | Self::OtpSms | Self::OtpEmail)
    }
}

/// The set of authentication methods registered for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthMethodSet(BTreeSet<AuthMethodType>);

impl AuthMethodSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the method is registered.
    #[must_use]
    pub fn contains(&self, method: AuthMethodType) -> bool {
        self.0.contains(&method)
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the single registered method, if exactly one is registered.
    #[must_use]
    pub fn single(&self) -> Option<AuthMethodType> {
        if self.0.len() == 1 {
            self.0.iter().next().copied()
        } else {
            None
        }
    }

    /// Iterates over the registered methods.
    pub fn iter(&self) -> impl Iterator<Item = AuthMethodType> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<AuthMethodType> for AuthMethodSet {
    fn from_iter<I: IntoIterator<Item = AuthMethodType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether passkeys may be used for login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasskeysType {
    NotAllowed,
    #[default]
    Allowed,
}

/// Effective login policy of an organization (or the instance default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSettings {
    /// Users must pass a second factor on every login.
    pub force_mfa: bool,
    /// Users must pass a second factor when logging in locally.
    pub force_mfa_local_only: bool,
    /// Where to send users that finished a flow without a client redirect.
    pub default_redirect_uri: Option<String>,
    pub allow_username_password: bool,
    pub allow_register: bool,
    pub allow_external_idp: bool,
    pub ignore_unknown_usernames: bool,
    pub allow_domain_discovery: bool,
    pub disable_login_with_email: bool,
    pub disable_login_with_phone: bool,
    pub passkeys_type: PasskeysType,
}

impl LoginSettings {
    /// Returns true if the policy forces a second factor in any form.
    #[must_use]
    pub fn requires_mfa(&self) -> bool {
        self.force_mfa || self.force_mfa_local_only
    }
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            force_mfa: false,
            force_mfa_local_only: false,
            default_redirect_uri: None,
            allow_username_password: true,
            allow_register: false,
            allow_external_idp: false,
            ignore_unknown_usernames: false,
            allow_domain_discovery: false,
            disable_login_with_email: false,
            disable_login_with_phone: false,
            passkeys_type: PasskeysType::default(),
        }
    }
}

/// Read access to the policy store.
#[async_trait]
pub trait PolicyLookup: Send + Sync {
    /// Lists the authentication method types registered for a user.
    async fn list_authentication_method_types(
        &self,
        user_id: &UserId,
    ) -> Result<AuthMethodSet, ApiError>;

    /// Returns the effective login settings for an organization, or the
    /// instance defaults when no organization is given.
    async fn get_login_settings(
        &self,
        organization_id: Option<&OrganizationId>,
    ) -> Result<LoginSettings, ApiError>;
}
