//! HTTP client for the platform's v2 REST API.
//!
//! [`PlatformClient`] implements every collaborator trait the login flow
//! needs. Requests authenticate with the service user's bearer token and
//! carry the configured timeout; failed requests are mapped to
//! [`ApiError`] so the router can branch on the platform's status codes.

pub mod wire;

use async_trait::async_trait;
use authflow_continuation::{
    AuthorizationRequest, CallbackResponse, IdentityProvider, IdentityProviderRegistry,
    IdpFlowUrls, IdpNextStep, OidcBackend, Organization, OrganizationDirectory, SessionCallback,
};
use authflow_core::{ApiError, AuthRequestId, IdpId, OrganizationId, SessionId, UserId};
use authflow_session::{
    AuthMethodSet, LoginSettings, PolicyLookup, SessionRecord, SessionStore, UserDirectory,
    UserProfile, UserQuery,
};
use reqwest::{RequestBuilder, StatusCode};
use rootcause::prelude::Report;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::fmt;
use tracing::{debug, instrument};

use crate::config::ApiConfig;

const TEXT_QUERY_EQUALS: &str = "TEXT_QUERY_METHOD_EQUALS";
const TEXT_QUERY_EQUALS_IGNORE_CASE: &str = "TEXT_QUERY_METHOD_EQUALS_IGNORE_CASE";

/// Errors constructing the platform client.
#[derive(Debug)]
pub enum ClientError {
    /// The API configuration is unusable.
    InvalidConfig {
        /// Error details.
        details: String,
    },
    /// The HTTP client could not be built.
    Build {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { details } => {
                write!(f, "invalid platform api configuration: {}", details)
            }
            Self::Build { details } => write!(f, "failed to build http client: {}", details),
        }
    }
}

impl std::error::Error for ClientError {}

/// Client for the platform's v2 REST API.
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl PlatformClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or token is empty, or if the HTTP
    /// client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, Report<ClientError>> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::InvalidConfig {
                details: "base url is empty".to_string(),
            }
            .into());
        }
        if config.service_token.is_empty() {
            return Err(ClientError::InvalidConfig {
                details: "service token is empty".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ClientError::Build {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: config.service_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.send(self.http.get(self.url(path)).query(query), path)
            .await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.post(self.url(path)).json(body), path)
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                details: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| ApiError::Decode {
                details: e.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        debug!(path, status = %status, "platform request failed");
        Err(status_error(status, &body, path))
    }
}

/// Maps a failed response to an [`ApiError`], preferring the platform's
/// own status body.
fn status_error(status: StatusCode, body: &str, path: &str) -> ApiError {
    match serde_json::from_str::<wire::StatusBody>(body) {
        Ok(status_body) => ApiError::Status {
            code: status_body.code,
            message: status_body.message,
        },
        Err(_) if status == StatusCode::NOT_FOUND => ApiError::NotFound {
            resource: path.to_string(),
        },
        Err(_) => ApiError::Transport {
            details: format!("HTTP {}: {}", status, body),
        },
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn settings_context(organization_id: Option<&OrganizationId>) -> [(&'static str, &str); 1] {
    match organization_id {
        Some(id) => [("ctx.orgId", id.as_str())],
        None => [("ctx.instance", "true")],
    }
}

#[async_trait]
impl SessionStore for PlatformClient {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn list_sessions(&self, ids: &[SessionId]) -> Result<Vec<SessionRecord>, ApiError> {
        let body = json!({
            "queries": [{ "idsQuery": { "ids": ids } }]
        });
        let response: wire::ListSessionsResponse = self.post("/v2/sessions/search", &body).await?;
        Ok(response
            .sessions
            .into_iter()
            .map(SessionRecord::from)
            .collect())
    }
}

#[async_trait]
impl PolicyLookup for PlatformClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_authentication_method_types(
        &self,
        user_id: &UserId,
    ) -> Result<AuthMethodSet, ApiError> {
        let path = format!("/v2/users/{}/authentication_methods", segment(user_id.as_str()));
        let response: wire::AuthMethodsResponse = self.get(&path, &[]).await?;
        Ok(response.into_set())
    }

    #[instrument(skip(self), fields(organization_id = ?organization_id))]
    async fn get_login_settings(
        &self,
        organization_id: Option<&OrganizationId>,
    ) -> Result<LoginSettings, ApiError> {
        let response: wire::LoginSettingsResponse = self
            .get("/v2/settings/login", &settings_context(organization_id))
            .await?;
        let settings = response.settings.ok_or_else(|| ApiError::Decode {
            details: "login settings missing".to_string(),
        })?;
        Ok(settings.into())
    }
}

#[async_trait]
impl UserDirectory for PlatformClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
        let path = format!("/v2/users/{}", segment(user_id.as_str()));
        let response: wire::GetUserResponse = self.get(&path, &[]).await?;
        Ok(response.user.into())
    }

    #[instrument(skip(self, query), fields(organization_id = ?query.organization_id))]
    async fn search_users(&self, query: &UserQuery) -> Result<Vec<UserProfile>, ApiError> {
        let response: wire::SearchUsersResponse =
            self.post("/v2/users", &search_users_body(query)).await?;
        Ok(response.result.into_iter().map(UserProfile::from).collect())
    }
}

fn search_users_body(query: &UserQuery) -> serde_json::Value {
    let mut alternatives = vec![json!({
        "loginNameQuery": {
            "loginName": query.login_name,
            "method": TEXT_QUERY_EQUALS_IGNORE_CASE,
        }
    })];
    if query.match_email {
        alternatives.push(json!({
            "emailQuery": {
                "emailAddress": query.login_name,
                "method": TEXT_QUERY_EQUALS_IGNORE_CASE,
            }
        }));
    }
    if query.match_phone {
        alternatives.push(json!({
            "phoneQuery": {
                "number": query.login_name,
                "method": TEXT_QUERY_EQUALS,
            }
        }));
    }

    let mut queries = vec![json!({ "orQuery": { "queries": alternatives } })];
    if let Some(organization_id) = &query.organization_id {
        queries.push(json!({
            "organizationIdQuery": { "organizationId": organization_id }
        }));
    }
    json!({ "queries": queries })
}

#[async_trait]
impl OidcBackend for PlatformClient {
    #[instrument(skip(self), fields(auth_request_id = %id))]
    async fn get_auth_request(
        &self,
        id: &AuthRequestId,
    ) -> Result<AuthorizationRequest, ApiError> {
        let path = format!("/v2/oidc/auth_requests/{}", segment(id.as_str()));
        let response: wire::AuthRequestResponse = self.get(&path, &[]).await?;
        Ok(response.auth_request.into())
    }

    #[instrument(skip(self, session), fields(auth_request_id = %id, session_id = %session.session_id))]
    async fn create_callback(
        &self,
        id: &AuthRequestId,
        session: &SessionCallback,
    ) -> Result<CallbackResponse, ApiError> {
        let path = format!("/v2/oidc/auth_requests/{}", segment(id.as_str()));
        let body = wire::CreateCallbackRequest {
            session: wire::CallbackSession {
                session_id: session.session_id.as_str(),
                session_token: &session.session_token,
            },
        };
        let response: wire::CreateCallbackResponse = self.post(&path, &body).await?;
        Ok(CallbackResponse {
            callback_url: response.callback_url,
        })
    }
}

#[async_trait]
impl OrganizationDirectory for PlatformClient {
    #[instrument(skip(self))]
    async fn get_orgs_by_domain(&self, domain: &str) -> Result<Vec<Organization>, ApiError> {
        let body = json!({
            "queries": [{
                "domainQuery": { "domain": domain, "method": TEXT_QUERY_EQUALS }
            }]
        });
        let response: wire::SearchOrganizationsResponse =
            self.post("/v2/organizations/_search", &body).await?;
        Ok(response
            .result
            .into_iter()
            .map(Organization::from)
            .collect())
    }
}

#[async_trait]
impl IdentityProviderRegistry for PlatformClient {
    #[instrument(skip(self), fields(organization_id = ?organization_id))]
    async fn get_active_identity_providers(
        &self,
        organization_id: Option<&OrganizationId>,
    ) -> Result<Vec<IdentityProvider>, ApiError> {
        let response: wire::ActiveIdpsResponse = self
            .get("/v2/settings/login/idps", &settings_context(organization_id))
            .await?;
        Ok(response
            .identity_providers
            .into_iter()
            .map(IdentityProvider::from)
            .collect())
    }

    #[instrument(skip(self, urls), fields(idp_id = %idp_id))]
    async fn start_identity_provider_flow(
        &self,
        idp_id: &IdpId,
        urls: &IdpFlowUrls,
    ) -> Result<IdpNextStep, ApiError> {
        let body = wire::StartIdpIntentRequest {
            idp_id: idp_id.as_str(),
            urls: wire::IntentUrls {
                success_url: &urls.success_url,
                failure_url: &urls.failure_url,
            },
        };
        let response: wire::StartIdpIntentResponse = self.post("/v2/idp_intents", &body).await?;
        Ok(match response.auth_url {
            Some(url) if !url.is_empty() => IdpNextStep::Redirect(url),
            _ => IdpNextStep::Other,
        })
    }
}
