//! An in-memory platform for unit tests.

use async_trait::async_trait;
use authflow_core::{ApiError, AuthRequestId, IdpId, OrganizationId, SessionId, UserId};
use authflow_session::{
    AuthMethodSet, AuthMethodType, LoginSettings, PolicyLookup, SessionRecord, SessionStore,
    UserDirectory, UserProfile, UserQuery,
};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::idp::{IdentityProvider, IdentityProviderRegistry, IdpFlowUrls, IdpNextStep};
use crate::loginname::{LoginNameOutcome, LoginNameService, SendLoginName};
use crate::oidc::{CallbackResponse, OidcBackend, SessionCallback};
use crate::org::{Organization, OrganizationDirectory};
use crate::request::AuthorizationRequest;

pub struct FakePlatform {
    auth_requests: HashMap<AuthRequestId, AuthorizationRequest>,
    sessions: Vec<SessionRecord>,
    methods: HashMap<UserId, AuthMethodSet>,
    settings: LoginSettings,
    org_settings: HashMap<OrganizationId, LoginSettings>,
    users: Vec<UserProfile>,
    user_search_fails: bool,
    org_lookup_fails: bool,
    organizations: Vec<Organization>,
    idps: Vec<IdentityProvider>,
    idp_step: IdpNextStep,
    callback: Result<CallbackResponse, ApiError>,
    login_name: Result<LoginNameOutcome, ApiError>,
    callbacks: Mutex<Vec<(AuthRequestId, SessionCallback)>>,
    idp_flows: Mutex<Vec<(IdpId, IdpFlowUrls)>>,
    login_names: Mutex<Vec<SendLoginName>>,
    session_lookups: Mutex<Vec<Vec<SessionId>>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            auth_requests: HashMap::new(),
            sessions: Vec::new(),
            methods: HashMap::new(),
            settings: LoginSettings::default(),
            org_settings: HashMap::new(),
            users: Vec::new(),
            user_search_fails: false,
            org_lookup_fails: false,
            organizations: Vec::new(),
            idps: Vec::new(),
            idp_step: IdpNextStep::Redirect(Self::IDP_REDIRECT.to_string()),
            callback: Ok(CallbackResponse {
                callback_url: Some(Self::CALLBACK_URL.to_string()),
            }),
            login_name: Ok(LoginNameOutcome::Rejected {
                reason: "user not found".to_string(),
            }),
            callbacks: Mutex::new(Vec::new()),
            idp_flows: Mutex::new(Vec::new()),
            login_names: Mutex::new(Vec::new()),
            session_lookups: Mutex::new(Vec::new()),
        }
    }
}

impl FakePlatform {
    pub const IDP_REDIRECT: &'static str = "https://idp.test/authorize?state=1";
    pub const CALLBACK_URL: &'static str = "https://app.test/callback?code=abc";

    pub fn with_auth_request(mut self, request: AuthorizationRequest) -> Self {
        self.auth_requests.insert(request.id.clone(), request);
        self
    }

    pub fn with_session(mut self, session: SessionRecord) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn with_methods<const N: usize>(
        mut self,
        user_id: &str,
        methods: [AuthMethodType; N],
    ) -> Self {
        self.methods
            .insert(UserId::new(user_id), methods.into_iter().collect());
        self
    }

    pub fn with_settings(mut self, settings: LoginSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_org_settings(mut self, organization_id: &str, settings: LoginSettings) -> Self {
        self.org_settings
            .insert(OrganizationId::new(organization_id), settings);
        self
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_failing_user_search(mut self) -> Self {
        self.user_search_fails = true;
        self
    }

    pub fn with_failing_org_lookup(mut self) -> Self {
        self.org_lookup_fails = true;
        self
    }

    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organizations.push(organization);
        self
    }

    pub fn with_idp(mut self, idp: IdentityProvider) -> Self {
        self.idps.push(idp);
        self
    }

    pub fn with_idp_step(mut self, step: IdpNextStep) -> Self {
        self.idp_step = step;
        self
    }

    pub fn with_callback(mut self, callback: Result<CallbackResponse, ApiError>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_login_name_outcome(mut self, outcome: Result<LoginNameOutcome, ApiError>) -> Self {
        self.login_name = outcome;
        self
    }

    pub fn callbacks(&self) -> Vec<(AuthRequestId, SessionCallback)> {
        self.callbacks.lock().expect("lock").clone()
    }

    pub fn idp_flows(&self) -> Vec<(IdpId, IdpFlowUrls)> {
        self.idp_flows.lock().expect("lock").clone()
    }

    pub fn login_names(&self) -> Vec<SendLoginName> {
        self.login_names.lock().expect("lock").clone()
    }

    pub fn session_lookups(&self) -> Vec<Vec<SessionId>> {
        self.session_lookups.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SessionStore for FakePlatform {
    async fn list_sessions(&self, ids: &[SessionId]) -> Result<Vec<SessionRecord>, ApiError> {
        self.session_lookups.lock().expect("lock").push(ids.to_vec());
        Ok(self
            .sessions
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PolicyLookup for FakePlatform {
    async fn list_authentication_method_types(
        &self,
        user_id: &UserId,
    ) -> Result<AuthMethodSet, ApiError> {
        Ok(self.methods.get(user_id).cloned().unwrap_or_default())
    }

    async fn get_login_settings(
        &self,
        organization_id: Option<&OrganizationId>,
    ) -> Result<LoginSettings, ApiError> {
        Ok(organization_id
            .and_then(|id| self.org_settings.get(id))
            .unwrap_or(&self.settings)
            .clone())
    }
}

#[async_trait]
impl UserDirectory for FakePlatform {
    async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
        self.users
            .iter()
            .find(|u| &u.id == user_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("user {user_id}"),
            })
    }

    async fn search_users(&self, query: &UserQuery) -> Result<Vec<UserProfile>, ApiError> {
        if self.user_search_fails {
            return Err(ApiError::Transport {
                details: "connection refused".to_string(),
            });
        }
        Ok(self
            .users
            .iter()
            .filter(|u| {
                u.preferred_login_name == query.login_name
                    || (query.match_email && u.email() == Some(query.login_name.as_str()))
                    || (query.match_phone && u.phone() == Some(query.login_name.as_str()))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OidcBackend for FakePlatform {
    async fn get_auth_request(
        &self,
        id: &AuthRequestId,
    ) -> Result<AuthorizationRequest, ApiError> {
        self.auth_requests
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("auth request {id}"),
            })
    }

    async fn create_callback(
        &self,
        id: &AuthRequestId,
        session: &SessionCallback,
    ) -> Result<CallbackResponse, ApiError> {
        self.callbacks
            .lock()
            .expect("lock")
            .push((id.clone(), session.clone()));
        self.callback.clone()
    }
}

#[async_trait]
impl OrganizationDirectory for FakePlatform {
    async fn get_orgs_by_domain(&self, domain: &str) -> Result<Vec<Organization>, ApiError> {
        if self.org_lookup_fails {
            return Err(ApiError::Transport {
                details: "connection refused".to_string(),
            });
        }
        Ok(self
            .organizations
            .iter()
            .filter(|o| o.primary_domain.as_deref() == Some(domain))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdentityProviderRegistry for FakePlatform {
    async fn get_active_identity_providers(
        &self,
        _organization_id: Option<&OrganizationId>,
    ) -> Result<Vec<IdentityProvider>, ApiError> {
        Ok(self.idps.clone())
    }

    async fn start_identity_provider_flow(
        &self,
        idp_id: &IdpId,
        urls: &IdpFlowUrls,
    ) -> Result<IdpNextStep, ApiError> {
        self.idp_flows
            .lock()
            .expect("lock")
            .push((idp_id.clone(), urls.clone()));
        Ok(self.idp_step.clone())
    }
}

#[async_trait]
impl LoginNameService for FakePlatform {
    async fn send_login_name(
        &self,
        command: &SendLoginName,
    ) -> Result<LoginNameOutcome, ApiError> {
        self.login_names.lock().expect("lock").push(command.clone());
        self.login_name.clone()
    }
}
