//! JSON shapes of the platform's v2 REST API and their conversion into
//! domain types.

use authflow_continuation::{
    AuthorizationRequest, IdentityProvider, IdentityProviderType, Organization, Prompt,
};
use authflow_core::{OrganizationId, UserId};
use authflow_session::{
    AuthMethodSet, AuthMethodType, HumanProfile, LoginSettings, PasskeysType, SessionFactors,
    SessionRecord, SessionUser, UserProfile, UserState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by the platform.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

// Sessions

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub change_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub factors: Option<Factors>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factors {
    pub user: Option<UserFactor>,
    pub password: Option<Check>,
    #[serde(rename = "webAuthN")]
    pub web_auth_n: Option<Check>,
    pub intent: Option<Check>,
    pub totp: Option<Check>,
    pub otp_sms: Option<Check>,
    pub otp_email: Option<Check>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFactor {
    pub id: String,
    #[serde(default)]
    pub login_name: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub organization_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub verified_at: Option<DateTime<Utc>>,
}

fn verified(check: Option<Check>) -> Option<DateTime<Utc>> {
    check.and_then(|c| c.verified_at)
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        let factors = session.factors.unwrap_or_default();
        let user = factors.user.map(|u| SessionUser {
            id: UserId::new(u.id),
            login_name: u.login_name,
            display_name: u.display_name,
            organization_id: OrganizationId::new(u.organization_id),
        });
        SessionRecord {
            id: session.id.into(),
            change_date: session.change_date,
            expiration_date: session.expiration_date,
            factors: SessionFactors {
                user,
                password: verified(factors.password),
                web_auth_n: verified(factors.web_auth_n),
                totp: verified(factors.totp),
                otp_email: verified(factors.otp_email),
                otp_sms: verified(factors.otp_sms),
                intent: verified(factors.intent),
            },
        }
    }
}

// Authentication methods and settings

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethodsResponse {
    #[serde(default)]
    pub auth_method_types: Vec<String>,
}

impl AuthMethodsResponse {
    /// Converts the wire names, skipping unknown values.
    pub fn into_set(self) -> AuthMethodSet {
        self.auth_method_types
            .iter()
            .filter_map(|name| auth_method_type(name))
            .collect()
    }
}

fn auth_method_type(name: &str) -> Option<AuthMethodType> {
    let method = match name.strip_prefix("AUTHENTICATION_METHOD_TYPE_")? {
        "PASSWORD" => AuthMethodType::Password,
        "PASSKEY" => AuthMethodType::Passkey,
        "IDP" => AuthMethodType::Idp,
        "TOTP" => AuthMethodType::Totp,
        "U2F" => AuthMethodType::U2f,
        "OTP_SMS" => AuthMethodType::OtpSms,
        "OTP_EMAIL" => AuthMethodType::OtpEmail,
        _ => return None,
    };
    Some(method)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSettingsResponse {
    pub settings: Option<WireLoginSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireLoginSettings {
    pub allow_username_password: bool,
    pub allow_register: bool,
    pub allow_external_idp: bool,
    pub force_mfa: bool,
    pub force_mfa_local_only: bool,
    pub passkeys_type: String,
    pub ignore_unknown_usernames: bool,
    pub default_redirect_uri: String,
    pub allow_domain_discovery: bool,
    pub disable_login_with_email: bool,
    pub disable_login_with_phone: bool,
}

impl From<WireLoginSettings> for LoginSettings {
    fn from(s: WireLoginSettings) -> Self {
        let passkeys_type = if s.passkeys_type == "PASSKEYS_TYPE_NOT_ALLOWED" {
            PasskeysType::NotAllowed
        } else {
            PasskeysType::Allowed
        };
        LoginSettings {
            force_mfa: s.force_mfa,
            force_mfa_local_only: s.force_mfa_local_only,
            default_redirect_uri: Some(s.default_redirect_uri).filter(|uri| !uri.is_empty()),
            allow_username_password: s.allow_username_password,
            allow_register: s.allow_register,
            allow_external_idp: s.allow_external_idp,
            ignore_unknown_usernames: s.ignore_unknown_usernames,
            allow_domain_discovery: s.allow_domain_discovery,
            disable_login_with_email: s.disable_login_with_email,
            disable_login_with_phone: s.disable_login_with_phone,
            passkeys_type,
        }
    }
}

// Identity providers

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveIdpsResponse {
    #[serde(default)]
    pub identity_providers: Vec<WireIdentityProvider>,
}

#[derive(Debug, Deserialize)]
pub struct WireIdentityProvider {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub idp_type: String,
}

impl From<WireIdentityProvider> for IdentityProvider {
    fn from(idp: WireIdentityProvider) -> Self {
        IdentityProvider {
            id: idp.id.into(),
            name: idp.name,
            idp_type: idp_type(&idp.idp_type),
        }
    }
}

fn idp_type(name: &str) -> IdentityProviderType {
    match name.strip_prefix("IDENTITY_PROVIDER_TYPE_").unwrap_or(name) {
        "OIDC" => IdentityProviderType::Oidc,
        "JWT" => IdentityProviderType::Jwt,
        "LDAP" => IdentityProviderType::Ldap,
        "OAUTH" => IdentityProviderType::Oauth,
        "AZURE_AD" => IdentityProviderType::AzureAd,
        "GITHUB" => IdentityProviderType::Github,
        "GITHUB_ES" => IdentityProviderType::GithubEs,
        "GITLAB" => IdentityProviderType::Gitlab,
        "GITLAB_SELF_HOSTED" => IdentityProviderType::GitlabSelfHosted,
        "GOOGLE" => IdentityProviderType::Google,
        "SAML" => IdentityProviderType::Saml,
        "APPLE" => IdentityProviderType::Apple,
        _ => IdentityProviderType::Unspecified,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartIdpIntentRequest<'a> {
    pub idp_id: &'a str,
    pub urls: IntentUrls<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentUrls<'a> {
    pub success_url: &'a str,
    pub failure_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartIdpIntentResponse {
    pub auth_url: Option<String>,
}

// OIDC

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequestResponse {
    pub auth_request: WireAuthRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAuthRequest {
    pub id: String,
    #[serde(default)]
    pub prompt: Vec<String>,
    pub login_hint: Option<String>,
    pub hint_user_id: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl From<WireAuthRequest> for AuthorizationRequest {
    fn from(request: WireAuthRequest) -> Self {
        let mut converted = AuthorizationRequest::new(request.id);
        for prompt in request.prompt.iter().filter_map(|p| prompt_value(p)) {
            converted = converted.with_prompt(prompt);
        }
        if let Some(hint) = request.login_hint {
            converted = converted.with_login_hint(hint);
        }
        if let Some(user_id) = request.hint_user_id {
            converted = converted.with_hint_user_id(user_id);
        }
        converted.scope = request.scope;
        converted
    }
}

fn prompt_value(name: &str) -> Option<Prompt> {
    let prompt = match name.strip_prefix("PROMPT_")? {
        "NONE" => Prompt::None,
        "LOGIN" => Prompt::Login,
        "CONSENT" => Prompt::Consent,
        "SELECT_ACCOUNT" => Prompt::SelectAccount,
        "CREATE" => Prompt::Create,
        _ => return None,
    };
    Some(prompt)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallbackRequest<'a> {
    pub session: CallbackSession<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackSession<'a> {
    pub session_id: &'a str,
    pub session_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallbackResponse {
    pub callback_url: Option<String>,
}

// Users

#[derive(Debug, Deserialize)]
pub struct GetUserResponse {
    pub user: WireUser,
}

#[derive(Debug, Deserialize)]
pub struct SearchUsersResponse {
    #[serde(default)]
    pub result: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    pub user_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub preferred_login_name: String,
    #[serde(default)]
    pub details: Option<Details>,
    pub human: Option<WireHuman>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(default)]
    pub resource_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct WireHuman {
    pub email: Option<WireEmail>,
    pub phone: Option<WirePhone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEmail {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct WirePhone {
    #[serde(default)]
    pub phone: String,
}

impl From<WireUser> for UserProfile {
    fn from(user: WireUser) -> Self {
        let state = match user.state.as_str() {
            "USER_STATE_ACTIVE" => UserState::Active,
            "USER_STATE_INACTIVE" => UserState::Inactive,
            "USER_STATE_DELETED" => UserState::Deleted,
            "USER_STATE_LOCKED" => UserState::Locked,
            "USER_STATE_INITIAL" => UserState::Initial,
            _ => UserState::Unspecified,
        };
        let human = user.human.map(|h| {
            let (email, email_verified) = match h.email {
                Some(e) if !e.email.is_empty() => (Some(e.email), e.is_verified),
                _ => (None, false),
            };
            HumanProfile {
                email,
                email_verified,
                phone: h.phone.map(|p| p.phone).filter(|p| !p.is_empty()),
            }
        });
        UserProfile {
            id: UserId::new(user.user_id),
            preferred_login_name: user.preferred_login_name,
            organization_id: OrganizationId::new(
                user.details.map(|d| d.resource_owner).unwrap_or_default(),
            ),
            state,
            human,
        }
    }
}

// Organizations

#[derive(Debug, Deserialize)]
pub struct SearchOrganizationsResponse {
    #[serde(default)]
    pub result: Vec<WireOrganization>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrganization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub primary_domain: Option<String>,
}

impl From<WireOrganization> for Organization {
    fn from(org: WireOrganization) -> Self {
        Organization {
            id: OrganizationId::new(org.id),
            name: org.name,
            primary_domain: org.primary_domain.filter(|d| !d.is_empty()),
        }
    }
}
