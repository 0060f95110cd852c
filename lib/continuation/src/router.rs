//! Routing of OIDC authorization requests.
//!
//! The login application is entered with an authorization request ID and,
//! optionally, the ID of a session the user picked. [`AuthRequestRouter`]
//! decides where the browser goes next. Branches are tried in a fixed order
//! and the first applicable one wins:
//!
//! 1. A React server component probe is refused.
//! 2. A picked session finalizes the request directly.
//! 3. An identity provider requested through the scopes is started.
//! 4. The `prompt` values pick registration, login name entry, the account
//!    picker, silent authentication, or the automatic session selection.

use authflow_core::{ApiError, AuthRequestId, OrganizationId, SessionId};
use authflow_session::{
    PolicyLookup, SessionCookies, SessionRecord, SessionStore, SessionValidator, UserDirectory,
    find_valid_session,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::decision::{
    Decision, accounts_page, loginname_page, page_url, register_page, signedin_page,
};
use crate::error::{FlowError, FlowResult};
use crate::idp::{IdentityProviderRegistry, IdpFlowUrls};
use crate::loginname::{LoginNameResolver, LoginNameService, OnFailure, SendLoginName};
use crate::oidc::{OidcBackend, SessionCallback};
use crate::org::{OrganizationDirectory, resolve_single_org};
use crate::request::{AuthorizationRequest, Prompt};
use crate::scope::{OrganizationScope, ScopeHints};

/// The platform services the router talks to.
#[derive(Clone)]
pub struct FlowServices {
    pub sessions: Arc<dyn SessionStore>,
    pub policies: Arc<dyn PolicyLookup>,
    pub users: Arc<dyn UserDirectory>,
    pub oidc: Arc<dyn OidcBackend>,
    pub organizations: Arc<dyn OrganizationDirectory>,
    pub idps: Arc<dyn IdentityProviderRegistry>,
    pub login_names: Arc<dyn LoginNameService>,
}

impl FlowServices {
    /// Uses one platform client for every service, with a
    /// [`LoginNameResolver`] on top of it for login name continuation.
    #[must_use]
    pub fn from_platform<P>(platform: Arc<P>, public_url: &str) -> Self
    where
        P: SessionStore
            + PolicyLookup
            + UserDirectory
            + OidcBackend
            + OrganizationDirectory
            + IdentityProviderRegistry
            + 'static,
    {
        let login_names = LoginNameResolver::new(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            platform.clone(),
            public_url,
        );
        Self {
            sessions: platform.clone(),
            policies: platform.clone(),
            users: platform.clone(),
            oidc: platform.clone(),
            organizations: platform.clone(),
            idps: platform,
            login_names: Arc::new(login_names),
        }
    }

    /// Replaces the login name service.
    #[must_use]
    pub fn with_login_names(mut self, login_names: Arc<dyn LoginNameService>) -> Self {
        self.login_names = login_names;
        self
    }
}

/// Router settings.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Externally visible base URL of the login application, used for the
    /// identity provider return URLs.
    pub public_url: String,
    /// Reject sessions of users whose email is not verified.
    pub require_verified_email: bool,
}

/// One incoming request to continue an authorization request.
#[derive(Debug, Clone, Default)]
pub struct RouteInput {
    pub auth_request_id: Option<AuthRequestId>,
    /// The session the user picked, if any.
    pub session_id: Option<SessionId>,
    /// Set when the request is a React server component probe (`_rsc`).
    pub rsc_probe: bool,
    /// The browser's sessions cookie.
    pub cookies: SessionCookies,
}

/// Decides how an authorization request continues.
#[derive(Clone)]
pub struct AuthRequestRouter {
    services: FlowServices,
    options: RouterOptions,
}

impl AuthRequestRouter {
    #[must_use]
    pub fn new(services: FlowServices, options: RouterOptions) -> Self {
        Self { services, options }
    }

    fn validator(&self) -> SessionValidator<'_> {
        SessionValidator::new(self.services.policies.as_ref(), self.services.users.as_ref())
            .require_verified_email(self.options.require_verified_email)
    }

    /// Routes one request.
    ///
    /// Expected outcomes, including refusals, are returned as a [`Decision`].
    /// `Err` is reserved for failures of the platform services that leave
    /// no sensible page to go to.
    #[instrument(
        skip(self, input),
        fields(
            auth_request_id = input.auth_request_id.as_ref().map(AuthRequestId::as_str),
            session_id = input.session_id.as_ref().map(SessionId::as_str),
        )
    )]
    pub async fn route(&self, input: RouteInput) -> FlowResult<Decision> {
        if input.rsc_probe {
            return Ok(Decision::internal_error("No _rsc supported"));
        }

        let Some(auth_request_id) = input.auth_request_id.as_ref() else {
            return Ok(Decision::internal_error("No authRequestId provided"));
        };

        let sessions = self.load_sessions(&input.cookies).await?;

        if let Some(session_id) = input.session_id.as_ref() {
            let confirmed = self
                .confirm_session(auth_request_id, session_id, &sessions, &input.cookies)
                .await?;
            if let Some(decision) = confirmed {
                return Ok(decision);
            }
        }

        let request = self
            .services
            .oidc
            .get_auth_request(auth_request_id)
            .await
            .map_err(|e| FlowError::AuthRequest {
                details: e.to_string(),
            })?;

        let hints = ScopeHints::parse(&request.scope);
        let organization = self.resolve_organization(&hints).await;

        if let Some(decision) = self
            .start_requested_idp(&request, &hints, organization.as_ref())
            .await
        {
            return Ok(decision);
        }

        self.route_by_prompt(&request, organization.as_ref(), &sessions, &input.cookies)
            .await
    }

    async fn load_sessions(
        &self,
        cookies: &SessionCookies,
    ) -> FlowResult<Vec<SessionRecord>> {
        let ids = cookies.ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sessions = self
            .services
            .sessions
            .list_sessions(&ids)
            .await
            .map_err(|e| FlowError::Sessions {
                details: e.to_string(),
            })?;
        debug!(cookies = ids.len(), sessions = sessions.len(), "loaded sessions");
        Ok(sessions)
    }

    /// Finalizes the request with the session the user picked.
    ///
    /// Returns `None` when the session or its cookie is unknown, in which
    /// case routing carries on as if no session was picked.
    async fn confirm_session(
        &self,
        auth_request_id: &AuthRequestId,
        session_id: &SessionId,
        sessions: &[SessionRecord],
        cookies: &SessionCookies,
    ) -> FlowResult<Option<Decision>> {
        let Some(session) = sessions.iter().find(|s| &s.id == session_id) else {
            debug!("picked session not found");
            return Ok(None);
        };

        let invalid_user = match session.user() {
            Some(user) => (!self.validator().is_valid(session).await).then_some(user),
            None => None,
        };
        if let Some(user) = invalid_user {
            info!("picked session is not valid, continuing with its login name");
            let command = SendLoginName::new(user.login_name.clone())
                .with_organization(Some(user.organization_id.clone()))
                .with_auth_request(auth_request_id.clone());
            if let Some(location) = self
                .continue_with_login_name(&command, OnFailure::Propagate)
                .await?
            {
                return Ok(Some(Decision::redirect(location)));
            }
        }

        let Some(cookie) = cookies.find_usable(&session.id) else {
            debug!("no usable cookie for picked session");
            return Ok(None);
        };
        let Some(session_token) = cookie.token() else {
            return Ok(None);
        };

        let callback = SessionCallback {
            session_id: session.id.clone(),
            session_token: session_token.to_string(),
        };
        match self
            .services
            .oidc
            .create_callback(auth_request_id, &callback)
            .await
        {
            Ok(response) => Ok(Some(match response.url() {
                Some(url) => Decision::redirect(url),
                None => Decision::internal_error("could not create callback"),
            })),
            Err(e) if e.code() == Some(ApiError::FAILED_PRECONDITION) => {
                info!("auth request was already handled");
                self.already_handled(session).await.map(Some)
            }
            Err(e) => {
                warn!(error = %e, "could not create callback for picked session");
                Ok(Some(Decision::internal_error(e.to_string())))
            }
        }
    }

    /// Where to send a user whose authorization request was finalized before.
    async fn already_handled(&self, session: &SessionRecord) -> FlowResult<Decision> {
        let user = session.user();
        let settings = self
            .services
            .policies
            .get_login_settings(user.map(|u| &u.organization_id))
            .await
            .map_err(|e| FlowError::Settings {
                details: e.to_string(),
            })?;

        let location = match (settings.default_redirect_uri, user) {
            (Some(uri), _) if !uri.is_empty() => uri,
            (_, Some(user)) => signedin_page(&user.login_name, &user.organization_id),
            (_, None) => page_url("/signedin", &[]),
        };
        Ok(Decision::redirect(location))
    }

    async fn continue_with_login_name(
        &self,
        command: &SendLoginName,
        on_failure: OnFailure,
    ) -> FlowResult<Option<String>> {
        match self.services.login_names.send_login_name(command).await {
            Ok(outcome) => {
                if outcome.redirect().is_none() {
                    debug!(?outcome, "login name did not lead to a page");
                }
                Ok(outcome.redirect().map(str::to_string))
            }
            Err(e) => match on_failure {
                OnFailure::Swallow => {
                    warn!(error = %e, "could not continue with login name");
                    Ok(None)
                }
                OnFailure::Propagate => Err(FlowError::LoginName {
                    details: e.to_string(),
                }
                .into()),
            },
        }
    }

    async fn resolve_organization(&self, hints: &ScopeHints) -> Option<OrganizationId> {
        match hints.organization.as_ref()? {
            OrganizationScope::Id(id) => Some(id.clone()),
            OrganizationScope::Domain(domain) => {
                match resolve_single_org(self.services.organizations.as_ref(), domain).await {
                    Ok(org) => {
                        if org.is_none() {
                            debug!(domain = %domain, "domain does not match exactly one organization");
                        }
                        org
                    }
                    Err(e) => {
                        warn!(domain = %domain, error = %e, "could not resolve organization domain");
                        None
                    }
                }
            }
        }
    }

    /// Starts the identity provider requested through the scopes.
    ///
    /// Returns `None` when no known provider was requested.
    async fn start_requested_idp(
        &self,
        request: &AuthorizationRequest,
        hints: &ScopeHints,
        organization: Option<&OrganizationId>,
    ) -> Option<Decision> {
        let idp_id = hints.idp_id.as_ref()?;

        let idps = match self
            .services
            .idps
            .get_active_identity_providers(organization)
            .await
        {
            Ok(idps) => idps,
            Err(e) => {
                warn!(idp_id = %idp_id, error = %e, "could not list identity providers");
                return None;
            }
        };
        let Some(idp) = idps.iter().find(|idp| &idp.id == idp_id) else {
            debug!(idp_id = %idp_id, "requested identity provider is not active");
            return None;
        };
        let Some(slug) = idp.idp_type.slug() else {
            debug!(idp_id = %idp_id, "requested identity provider has an unknown type");
            return None;
        };

        let mut params = vec![("authRequestId", request.id.as_str())];
        if let Some(organization) = organization {
            params.push(("organization", organization.as_str()));
        }
        let urls = IdpFlowUrls::for_provider(&self.options.public_url, slug, "success", &params);

        match self
            .services
            .idps
            .start_identity_provider_flow(&idp.id, &urls)
            .await
        {
            Ok(step) => match step.redirect_url() {
                Some(url) => Some(Decision::redirect(url)),
                None => Some(Decision::internal_error(
                    "could not start identity provider flow",
                )),
            },
            Err(e) => {
                warn!(idp_id = %idp_id, error = %e, "could not start identity provider flow");
                Some(Decision::internal_error(
                    "could not start identity provider flow",
                ))
            }
        }
    }

    async fn route_by_prompt(
        &self,
        request: &AuthorizationRequest,
        organization: Option<&OrganizationId>,
        sessions: &[SessionRecord],
        cookies: &SessionCookies,
    ) -> FlowResult<Decision> {
        let id = &request.id;

        if request.has_prompt(Prompt::Create) {
            return Ok(Decision::redirect(register_page(id, organization)));
        }

        if sessions.is_empty() {
            if request.has_prompt(Prompt::None) {
                return Ok(Decision::bad_request("No active session found"));
            }
            return Ok(Decision::redirect(loginname_page(
                id,
                request.login_hint(),
                true,
                organization,
            )));
        }

        if request.has_prompt(Prompt::SelectAccount) {
            return Ok(Decision::redirect(accounts_page(id, organization)));
        }

        if request.has_prompt(Prompt::Login) {
            if let Some(login_hint) = request.login_hint() {
                let command = SendLoginName::new(login_hint)
                    .with_organization(organization.cloned())
                    .with_auth_request(id.clone());
                if let Some(location) = self
                    .continue_with_login_name(&command, OnFailure::Swallow)
                    .await?
                {
                    return Ok(Decision::redirect(location));
                }
            }
            return Ok(Decision::redirect(loginname_page(
                id,
                request.login_hint(),
                false,
                organization,
            )));
        }

        let selected = self.select_session(request, sessions, cookies).await;

        if request.has_prompt(Prompt::None) {
            let Some(callback) = selected else {
                return Ok(Decision::bad_request("No active session found"));
            };
            let response = self
                .services
                .oidc
                .create_callback(id, &callback)
                .await
                .map_err(|e| FlowError::Callback {
                    details: e.to_string(),
                })?;
            return Ok(match response.url() {
                Some(url) => Decision::redirect(url),
                None => Decision::internal_error("could not create callback"),
            });
        }

        let Some(callback) = selected else {
            return Ok(Decision::redirect(accounts_page(id, organization)));
        };
        match self.services.oidc.create_callback(id, &callback).await {
            Ok(response) => match response.url() {
                Some(url) => Ok(Decision::redirect(url)),
                None => Ok(Decision::redirect(accounts_page(id, organization))),
            },
            Err(e) => {
                warn!(error = %e, "could not create callback, falling back to account selection");
                Ok(Decision::redirect(accounts_page(id, organization)))
            }
        }
    }

    /// Picks the session to finalize the request with, together with the
    /// token from its cookie.
    async fn select_session(
        &self,
        request: &AuthorizationRequest,
        sessions: &[SessionRecord],
        cookies: &SessionCookies,
    ) -> Option<SessionCallback> {
        let validator = self.validator();
        let session = find_valid_session(&validator, sessions, &request.selection_hints()).await?;
        let Some(token) = cookies.find_usable(&session.id).and_then(|c| c.token()) else {
            debug!(session_id = %session.id, "selected session has no usable cookie");
            return None;
        };
        Some(SessionCallback {
            session_id: session.id,
            session_token: token.to_string(),
        })
    }
}
