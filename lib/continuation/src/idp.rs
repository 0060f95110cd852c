//! External identity providers.

use async_trait::async_trait;
use authflow_core::{ApiError, IdpId, OrganizationId};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Kinds of external identity providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityProviderType {
    #[default]
    Unspecified,
    Oidc,
    Jwt,
    Ldap,
    Oauth,
    AzureAd,
    Github,
    GithubEs,
    Gitlab,
    GitlabSelfHosted,
    Google,
    Saml,
    Apple,
}

impl IdentityProviderType {
    /// Returns the URL path segment of the login pages handling this
    /// provider type, or `None` for an unknown type.
    #[must_use]
    pub fn slug(self) -> Option<&'static str> {
        match self {
            Self::Github | Self::GithubEs => Some("github"),
            Self::Gitlab | Self::GitlabSelfHosted => Some("gitlab"),
            Self::Google => Some("google"),
            Self::AzureAd => Some("azure"),
            Self::Apple => Some("apple"),
            Self::Oidc => Some("oidc"),
            Self::Oauth => Some("oauth"),
            Self::Jwt => Some("jwt"),
            Self::Ldap => Some("ldap"),
            Self::Saml => Some("saml"),
            Self::Unspecified => None,
        }
    }
}

/// An identity provider active for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub id: IdpId,
    pub name: String,
    pub idp_type: IdentityProviderType,
}

/// Where the identity provider sends the browser back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpFlowUrls {
    pub success_url: String,
    pub failure_url: String,
}

impl IdpFlowUrls {
    /// Builds `{base}/idp/{slug}/{success_step}?..` and
    /// `{base}/idp/{slug}/failure?..` with the same query on both.
    #[must_use]
    pub fn for_provider(
        base_url: &str,
        slug: &str,
        success_step: &str,
        params: &[(&str, &str)],
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key, value);
        }
        let query = query.finish();

        Self {
            success_url: format!("{base}/idp/{slug}/{success_step}?{query}"),
            failure_url: format!("{base}/idp/{slug}/failure?{query}"),
        }
    }
}

/// What the browser has to do after an identity provider flow was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpNextStep {
    /// Redirect the browser to the provider.
    Redirect(String),
    /// The provider needs something other than a redirect (form post,
    /// credentials entered on a login page).
    Other,
}

impl IdpNextStep {
    /// Returns the redirect URL, if any.
    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Self::Redirect(url) if !url.is_empty() => Some(url),
            _ => None,
        }
    }
}

/// The platform's identity provider registry.
#[async_trait]
pub trait IdentityProviderRegistry: Send + Sync {
    /// Lists the identity providers active for the organization, or for the
    /// instance default when no organization is given.
    async fn get_active_identity_providers(
        &self,
        organization_id: Option<&OrganizationId>,
    ) -> Result<Vec<IdentityProvider>, ApiError>;

    /// Starts an identity provider intent.
    async fn start_identity_provider_flow(
        &self,
        idp_id: &IdpId,
        urls: &IdpFlowUrls,
    ) -> Result<IdpNextStep, ApiError>;
}
