//! HTTP routes of the login application.

use authflow_continuation::{AuthRequestRouter, Decision, RouteInput};
use authflow_core::{AuthRequestId, SessionId};
use authflow_session::SessionCookies;
use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::AppError;

/// Shared state of the HTTP handlers.
pub struct AppState {
    router: AuthRequestRouter,
    base_path: String,
    sessions_cookie: String,
}

impl AppState {
    /// Creates the state from a router and the server configuration.
    #[must_use]
    pub fn new(router: AuthRequestRouter, config: &ServerConfig) -> Self {
        Self {
            router,
            base_path: config.base_path().to_string(),
            sessions_cookie: config.cookies.sessions_cookie.clone(),
        }
    }

    /// Prefixes login pages with the base path; external URLs pass through.
    fn location(&self, target: &str) -> String {
        if target.starts_with('/') && !target.starts_with("//") {
            format!("{}{}", self.base_path, target)
        } else {
            target.to_string()
        }
    }

    fn session_cookies(&self, jar: &CookieJar) -> SessionCookies {
        let Some(cookie) = jar.get(&self.sessions_cookie) else {
            return SessionCookies::default();
        };
        match SessionCookies::parse(cookie.value()) {
            Ok(cookies) => cookies.without_expired(Utc::now()),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable sessions cookie");
                SessionCookies::default()
            }
        }
    }
}

/// Query parameters of the login entry point.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    auth_request: Option<String>,
    auth_request_id: Option<String>,
    session_id: Option<String>,
    #[serde(rename = "_rsc")]
    rsc: Option<String>,
}

impl LoginQuery {
    fn auth_request_id(&self) -> Option<AuthRequestId> {
        self.auth_request
            .as_deref()
            .or(self.auth_request_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(AuthRequestId::from)
    }

    fn session_id(&self) -> Option<SessionId> {
        self.session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(SessionId::from)
    }
}

/// Continues an OIDC authorization request.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let input = RouteInput {
        auth_request_id: query.auth_request_id(),
        session_id: query.session_id(),
        rsc_probe: query.rsc.is_some(),
        cookies: state.session_cookies(&jar),
    };

    match state.router.route(input).await? {
        Decision::Redirect { location } => {
            Ok(Redirect::to(&state.location(&location)).into_response())
        }
        Decision::Error { status, message } => Err(AppError::Rejected { status, message }),
    }
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let base_path = state.base_path.clone();
    let routes = Router::new()
        .route("/login", get(login))
        .route("/healthz", get(healthz))
        .with_state(Arc::new(state));

    let routes = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&base_path, routes)
    };

    routes.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use authflow_continuation::{
        AuthorizationRequest, CallbackResponse, FlowServices, IdentityProvider,
        IdentityProviderRegistry, IdpFlowUrls, IdpNextStep, OidcBackend, Organization,
        OrganizationDirectory, RouterOptions, SessionCallback,
    };
    use authflow_core::{ApiError, IdpId, OrganizationId, UserId};
    use authflow_session::{
        AuthMethodSet, Factor, LoginSettings, PolicyLookup, SessionCookie, SessionRecord,
        SessionStore, SessionUser, UserDirectory, UserProfile, UserQuery,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::Duration;
    use tower::ServiceExt;

    const CALLBACK_URL: &str = "https://app.test/callback?code=abc";

    struct Platform {
        sessions: Vec<SessionRecord>,
    }

    #[async_trait]
    impl SessionStore for Platform {
        async fn list_sessions(&self, ids: &[SessionId]) -> Result<Vec<SessionRecord>, ApiError> {
            Ok(self
                .sessions
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl PolicyLookup for Platform {
        async fn list_authentication_method_types(
            &self,
            _user_id: &UserId,
        ) -> Result<AuthMethodSet, ApiError> {
            Ok(AuthMethodSet::default())
        }

        async fn get_login_settings(
            &self,
            _organization_id: Option<&OrganizationId>,
        ) -> Result<LoginSettings, ApiError> {
            Ok(LoginSettings::default())
        }
    }

    #[async_trait]
    impl UserDirectory for Platform {
        async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
            Err(ApiError::NotFound {
                resource: format!("user {user_id}"),
            })
        }

        async fn search_users(&self, _query: &UserQuery) -> Result<Vec<UserProfile>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl OidcBackend for Platform {
        async fn get_auth_request(
            &self,
            id: &AuthRequestId,
        ) -> Result<AuthorizationRequest, ApiError> {
            if id.as_str() == "ar1" {
                Ok(AuthorizationRequest::new("ar1"))
            } else {
                Err(ApiError::NotFound {
                    resource: format!("auth request {id}"),
                })
            }
        }

        async fn create_callback(
            &self,
            _id: &AuthRequestId,
            _session: &SessionCallback,
        ) -> Result<CallbackResponse, ApiError> {
            Ok(CallbackResponse {
                callback_url: Some(CALLBACK_URL.to_string()),
            })
        }
    }

    #[async_trait]
    impl OrganizationDirectory for Platform {
        async fn get_orgs_by_domain(&self, _domain: &str) -> Result<Vec<Organization>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl IdentityProviderRegistry for Platform {
        async fn get_active_identity_providers(
            &self,
            _organization_id: Option<&OrganizationId>,
        ) -> Result<Vec<IdentityProvider>, ApiError> {
            Ok(Vec::new())
        }

        async fn start_identity_provider_flow(
            &self,
            _idp_id: &IdpId,
            _urls: &IdpFlowUrls,
        ) -> Result<IdpNextStep, ApiError> {
            Ok(IdpNextStep::Other)
        }
    }

    fn server_config(base_path: &str) -> ServerConfig {
        config::Config::builder()
            .set_override("public_url", "https://login.acme.test")
            .and_then(|b| b.set_override("base_path", base_path))
            .and_then(|b| b.set_override("api.base_url", "https://acme.zitadel.test"))
            .and_then(|b| b.set_override("api.service_token", "secret"))
            .expect("overrides")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize")
    }

    fn test_app(base_path: &str, sessions: Vec<SessionRecord>) -> Router {
        let config = server_config(base_path);
        let services = FlowServices::from_platform(
            Arc::new(Platform { sessions }),
            &config.public_login_url(),
        );
        let router = AuthRequestRouter::new(
            services,
            RouterOptions {
                public_url: config.public_login_url(),
                require_verified_email: false,
            },
        );
        app(AppState::new(router, &config))
    }

    fn valid_session(id: &str) -> SessionRecord {
        let now = Utc::now();
        SessionRecord::new(id)
            .with_user(SessionUser::new("u1", "alice@acme.test", "org1"))
            .with_factor(Factor::Password, now)
            .with_change_date(now)
            .with_expiration_date(now + Duration::hours(1))
    }

    fn sessions_cookie(entries: Vec<SessionCookie>) -> String {
        let json = serde_json::to_string(&SessionCookies::new(entries)).expect("json");
        format!("sessions={}", urlencoding::encode(&json))
    }

    async fn get(app: Router, uri: &str, cookie: Option<String>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn error_message(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        json["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn without_sessions_redirects_to_loginname() {
        let response = get(test_app("", Vec::new()), "/login?authRequest=ar1", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/loginname?authRequestId=ar1");
    }

    #[tokio::test]
    async fn login_pages_carry_the_base_path() {
        let response = get(
            test_app("/ui/v2/login", Vec::new()),
            "/ui/v2/login/login?authRequestId=ar1",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/ui/v2/login/loginname?authRequestId=ar1");
    }

    #[tokio::test]
    async fn missing_auth_request_is_an_internal_error() {
        let response = get(test_app("", Vec::new()), "/login", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(response).await, "No authRequestId provided");
    }

    #[tokio::test]
    async fn rsc_probe_is_rejected() {
        let response = get(test_app("", Vec::new()), "/login?authRequest=ar1&_rsc=1", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(response).await, "No _rsc supported");
    }

    #[tokio::test]
    async fn picked_session_completes_the_request() {
        let cookie = sessions_cookie(vec![SessionCookie::new("s1", "token-s1")]);
        let response = get(
            test_app("/ui/v2/login", vec![valid_session("s1")]),
            "/ui/v2/login/login?authRequest=ar1&sessionId=s1",
            Some(cookie),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), CALLBACK_URL);
    }

    #[tokio::test]
    async fn unreadable_cookie_counts_as_no_sessions() {
        let response = get(
            test_app("", vec![valid_session("s1")]),
            "/login?authRequest=ar1",
            Some("sessions=not-json".to_string()),
        )
        .await;
        assert_eq!(location(&response), "/loginname?authRequestId=ar1");
    }

    #[tokio::test]
    async fn expired_cookie_entries_are_ignored() {
        let mut entry = SessionCookie::new("s1", "token-s1");
        entry.expiration_ts = (Utc::now() - Duration::minutes(5))
            .timestamp_millis()
            .to_string();
        let response = get(
            test_app("", vec![valid_session("s1")]),
            "/login?authRequest=ar1&sessionId=s1",
            Some(sessions_cookie(vec![entry])),
        )
        .await;
        assert_eq!(location(&response), "/loginname?authRequestId=ar1");
    }

    #[tokio::test]
    async fn unknown_auth_request_hides_details() {
        let response = get(test_app("", Vec::new()), "/login?authRequest=nope", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(response).await, "Internal server error");
    }

    #[tokio::test]
    async fn health_check() {
        let response = get(test_app("", Vec::new()), "/healthz", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
