//! Continuing the login with a typed login name.
//!
//! Given the name a user typed (or the `login_hint` of an authorization
//! request), [`LoginNameResolver`] looks up the user and picks the page that
//! continues the login: password, passkey, an external identity provider,
//! registration or email verification.

use async_trait::async_trait;
use authflow_core::{ApiError, AuthRequestId, OrganizationId, UserId};
use authflow_session::{
    AuthMethodSet, AuthMethodType, LoginSettings, PasskeysType, PolicyLookup, UserDirectory,
    UserProfile, UserQuery, UserState,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::decision::page_url;
use crate::idp::{IdentityProviderRegistry, IdpFlowUrls};
use crate::org::{OrganizationDirectory, resolve_single_org};

/// A login name to continue with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendLoginName {
    pub login_name: String,
    pub organization: Option<OrganizationId>,
    pub auth_request_id: Option<AuthRequestId>,
}

impl SendLoginName {
    /// Creates a command without organization or request context.
    #[must_use]
    pub fn new(login_name: impl Into<String>) -> Self {
        Self {
            login_name: login_name.into(),
            organization: None,
            auth_request_id: None,
        }
    }

    /// Scopes the command to an organization.
    #[must_use]
    pub fn with_organization(mut self, organization: Option<OrganizationId>) -> Self {
        self.organization = organization;
        self
    }

    /// Attaches the authorization request being continued.
    #[must_use]
    pub fn with_auth_request(mut self, id: AuthRequestId) -> Self {
        self.auth_request_id = Some(id);
        self
    }

    /// The `requestId` query value used by the login pages.
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        self.auth_request_id.as_ref().map(|id| format!("oidc_{id}"))
    }

    /// The domain part of the login name, if it has one.
    fn domain_suffix(&self) -> Option<&str> {
        self.login_name
            .split_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }
}

/// Where the login continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginNameOutcome {
    /// Continue at this page or external URL.
    Redirect(String),
    /// The login name cannot be continued with.
    Rejected { reason: String },
}

impl LoginNameOutcome {
    fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    /// Returns the redirect target, if any.
    #[must_use]
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::Redirect(url) => Some(url),
            Self::Rejected { .. } => None,
        }
    }
}

/// How a caller treats a failed login name continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Log the failure and carry on.
    Swallow,
    /// Return the failure to the caller.
    Propagate,
}

/// Continues a login from a login name.
#[async_trait]
pub trait LoginNameService: Send + Sync {
    async fn send_login_name(&self, command: &SendLoginName)
    -> Result<LoginNameOutcome, ApiError>;
}

/// Resolves login names against the platform's user, policy, organization
/// and identity provider services.
pub struct LoginNameResolver {
    users: Arc<dyn UserDirectory>,
    policies: Arc<dyn PolicyLookup>,
    organizations: Arc<dyn OrganizationDirectory>,
    idps: Arc<dyn IdentityProviderRegistry>,
    public_url: String,
}

impl LoginNameResolver {
    /// Creates a resolver. `public_url` is the externally visible base URL
    /// of the login application.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        policies: Arc<dyn PolicyLookup>,
        organizations: Arc<dyn OrganizationDirectory>,
        idps: Arc<dyn IdentityProviderRegistry>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            policies,
            organizations,
            idps,
            public_url: public_url.into(),
        }
    }

    async fn existing_user(
        &self,
        command: &SendLoginName,
        user: &UserProfile,
    ) -> Result<LoginNameOutcome, ApiError> {
        let settings = self
            .policies
            .get_login_settings(Some(&user.organization_id))
            .await?;

        if !login_allowed_with(&settings, user, &command.login_name) {
            return Ok(LoginNameOutcome::rejected("user not found"));
        }

        if user.state == UserState::Initial {
            return Ok(LoginNameOutcome::rejected("initial user not supported"));
        }

        let organization = command
            .organization
            .clone()
            .unwrap_or_else(|| user.organization_id.clone());
        let request_id = command.request_id();
        let methods = self.policies.list_authentication_method_types(&user.id).await?;
        let login_name = user.preferred_login_name.as_str();

        if methods.is_empty() {
            let invite = if user.has_unverified_email() || user.email().is_none() {
                "true"
            } else {
                "false"
            };
            return Ok(LoginNameOutcome::Redirect(page_url(
                "/verify",
                &[
                    ("loginName", Some(login_name)),
                    ("send", Some("true")),
                    ("invite", Some(invite)),
                    ("requestId", request_id.as_deref()),
                    ("organization", Some(organization.as_str())),
                ],
            )));
        }

        if let Some(method) = methods.single() {
            return match method {
                AuthMethodType::Password if settings.allow_username_password => Ok(method_page(
                    "/password",
                    login_name,
                    None,
                    request_id.as_deref(),
                    &organization,
                )),
                AuthMethodType::Password => {
                    // Users without password login may still link an external account.
                    match self
                        .idp_redirect(Some(&user.id), Some(&organization), command)
                        .await?
                    {
                        Some(url) => Ok(LoginNameOutcome::Redirect(url)),
                        None => Ok(LoginNameOutcome::rejected("username password not allowed")),
                    }
                }
                AuthMethodType::Passkey if settings.passkeys_type == PasskeysType::NotAllowed => {
                    Ok(LoginNameOutcome::rejected("passkeys not allowed"))
                }
                AuthMethodType::Passkey => Ok(method_page(
                    "/passkey",
                    login_name,
                    None,
                    request_id.as_deref(),
                    &organization,
                )),
                AuthMethodType::Idp => {
                    self.idp_outcome(Some(&user.id), &organization, command)
                        .await
                }
                _ => Ok(LoginNameOutcome::rejected("no supported authentication method")),
            };
        }

        self.preferred_method(&methods, &settings, user, &organization, command)
            .await
    }

    /// Picks among several registered methods: passkey, then identity
    /// provider, then password.
    async fn preferred_method(
        &self,
        methods: &AuthMethodSet,
        settings: &LoginSettings,
        user: &UserProfile,
        organization: &OrganizationId,
        command: &SendLoginName,
    ) -> Result<LoginNameOutcome, ApiError> {
        let request_id = command.request_id();
        let login_name = user.preferred_login_name.as_str();

        if methods.contains(AuthMethodType::Passkey) {
            let alt_password =
                methods.contains(AuthMethodType::Password) && settings.allow_username_password;
            let alt_password = if alt_password { "true" } else { "false" };
            return Ok(method_page(
                "/passkey",
                login_name,
                Some(("altPassword", alt_password)),
                request_id.as_deref(),
                organization,
            ));
        }
        if methods.contains(AuthMethodType::Idp) {
            return self.idp_outcome(Some(&user.id), organization, command).await;
        }
        if methods.contains(AuthMethodType::Password) {
            if !settings.allow_username_password {
                return Ok(LoginNameOutcome::rejected("username password not allowed"));
            }
            return Ok(method_page(
                "/password",
                login_name,
                None,
                request_id.as_deref(),
                organization,
            ));
        }
        Ok(LoginNameOutcome::rejected("no supported authentication method"))
    }

    async fn unknown_user(
        &self,
        command: &SendLoginName,
        context_settings: LoginSettings,
    ) -> Result<LoginNameOutcome, ApiError> {
        let mut organization = command.organization.clone();
        let mut settings = context_settings;

        let domain = if organization.is_none() {
            command.domain_suffix()
        } else {
            None
        };
        let discovered = match domain {
            Some(domain) => resolve_single_org(self.organizations.as_ref(), domain).await?,
            None => None,
        };
        if let Some(org_id) = discovered {
            let org_settings = self.policies.get_login_settings(Some(&org_id)).await?;
            if org_settings.allow_domain_discovery {
                info!(organization = %org_id, "organization discovered from login name");
                organization = Some(org_id);
                settings = org_settings;
            } else {
                debug!(organization = %org_id, "organization does not allow domain discovery");
            }
        }

        if settings.allow_register && !settings.allow_username_password {
            return match self
                .idp_redirect(None, organization.as_ref(), command)
                .await?
            {
                Some(url) => Ok(LoginNameOutcome::Redirect(url)),
                None => Ok(LoginNameOutcome::rejected("user not found")),
            };
        }

        let request_id = command.request_id();

        let may_register = settings.allow_register
            && settings.allow_username_password
            && !settings.ignore_unknown_usernames;
        if let Some(organization) = organization.as_ref().filter(|_| may_register) {
            return Ok(LoginNameOutcome::Redirect(page_url(
                "/register",
                &[
                    ("organization", Some(organization.as_str())),
                    ("requestId", request_id.as_deref()),
                    ("email", Some(command.login_name.as_str())),
                ],
            )));
        }

        if settings.ignore_unknown_usernames {
            return Ok(LoginNameOutcome::Redirect(page_url(
                "/password",
                &[
                    ("loginName", Some(command.login_name.as_str())),
                    ("requestId", request_id.as_deref()),
                    ("organization", organization.as_ref().map(OrganizationId::as_str)),
                ],
            )));
        }

        Ok(LoginNameOutcome::rejected("user not found"))
    }

    async fn idp_outcome(
        &self,
        user_id: Option<&UserId>,
        organization: &OrganizationId,
        command: &SendLoginName,
    ) -> Result<LoginNameOutcome, ApiError> {
        match self.idp_redirect(user_id, Some(organization), command).await? {
            Some(url) => Ok(LoginNameOutcome::Redirect(url)),
            None => Ok(LoginNameOutcome::rejected(
                "could not start identity provider flow",
            )),
        }
    }

    /// Starts the flow of the organization's identity provider if it has
    /// exactly one.
    async fn idp_redirect(
        &self,
        user_id: Option<&UserId>,
        organization: Option<&OrganizationId>,
        command: &SendLoginName,
    ) -> Result<Option<String>, ApiError> {
        let idps = self.idps.get_active_identity_providers(organization).await?;
        let [idp] = idps.as_slice() else {
            debug!(count = idps.len(), "no single identity provider to redirect to");
            return Ok(None);
        };
        let Some(slug) = idp.idp_type.slug() else {
            debug!(idp_id = %idp.id, "identity provider type has no login page");
            return Ok(None);
        };

        let request_id = command.request_id();
        let mut params = Vec::new();
        if let Some(user_id) = user_id {
            params.push(("userId", user_id.as_str()));
        }
        if let Some(request_id) = request_id.as_deref() {
            params.push(("requestId", request_id));
        }
        if let Some(organization) = organization {
            params.push(("organization", organization.as_str()));
        }

        let urls = IdpFlowUrls::for_provider(&self.public_url, slug, "process", &params);
        let step = self.idps.start_identity_provider_flow(&idp.id, &urls).await?;
        Ok(step.redirect_url().map(str::to_string))
    }
}

#[async_trait]
impl LoginNameService for LoginNameResolver {
    #[instrument(skip(self, command), fields(organization = ?command.organization))]
    async fn send_login_name(
        &self,
        command: &SendLoginName,
    ) -> Result<LoginNameOutcome, ApiError> {
        let settings = self
            .policies
            .get_login_settings(command.organization.as_ref())
            .await?;

        let query = UserQuery {
            login_name: command.login_name.clone(),
            organization_id: command.organization.clone(),
            match_email: !settings.disable_login_with_email,
            match_phone: !settings.disable_login_with_phone,
        };
        let mut users = self.users.search_users(&query).await?;

        match users.len() {
            0 => {
                debug!("no user found for login name");
                self.unknown_user(command, settings).await
            }
            1 => {
                let user = users.remove(0);
                self.existing_user(command, &user).await
            }
            count => {
                debug!(count, "login name is ambiguous");
                Ok(LoginNameOutcome::rejected("more than one user found"))
            }
        }
    }
}

fn method_page(
    path: &str,
    login_name: &str,
    extra: Option<(&str, &str)>,
    request_id: Option<&str>,
    organization: &OrganizationId,
) -> LoginNameOutcome {
    let mut params = vec![("loginName", Some(login_name))];
    if let Some((key, value)) = extra {
        params.push((key, Some(value)));
    }
    params.push(("requestId", request_id));
    params.push(("organization", Some(organization.as_str())));
    LoginNameOutcome::Redirect(page_url(path, &params))
}

/// Re-checks a user found without organization scope against the login
/// settings of the user's own organization.
fn login_allowed_with(settings: &LoginSettings, user: &UserProfile, login_name: &str) -> bool {
    let by_login_name = user.preferred_login_name == login_name;
    let by_email = user.email() == Some(login_name);
    let by_phone = user.phone() == Some(login_name);

    match (settings.disable_login_with_email, settings.disable_login_with_phone) {
        (true, true) => by_login_name,
        (true, false) => by_login_name || by_phone,
        (false, true) => by_login_name || by_email,
        (false, false) => true,
    }
}
