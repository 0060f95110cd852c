//! Session validity evaluation.
//!
//! A session can satisfy an authorization request only if it has not expired,
//! a primary factor was verified in it, and it complies with the MFA policy
//! that applies to its user. Evaluation never fails: missing data and
//! collaborator errors both make a session invalid.

use authflow_core::ApiError;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::{Factor, SessionRecord, SessionUser};
use crate::policy::{AuthMethodSet, AuthMethodType, PolicyLookup};
use crate::user::UserDirectory;

/// Registered second-factor methods in priority order, each paired with the
/// session factor that proves it. The first registered method decides.
pub const MFA_PRIORITY: [(AuthMethodType, Factor); 4] = [
    (AuthMethodType::Totp, Factor::Totp),
    (AuthMethodType::OtpEmail, Factor::OtpEmail),
    (AuthMethodType::OtpSms, Factor::OtpSms),
    (AuthMethodType::U2f, Factor::WebAuthN),
];

/// Returns the session factor that must be verified for a user with the
/// given registered methods, or `None` if no second factor is registered.
#[must_use]
pub fn required_second_factor(methods: &AuthMethodSet) -> Option<Factor> {
    MFA_PRIORITY
        .iter()
        .find(|(method, _)| methods.contains(*method))
        .map(|(_, factor)| *factor)
}

/// Evaluates whether sessions may be used to satisfy an authorization request.
pub struct SessionValidator<'a> {
    policies: &'a dyn PolicyLookup,
    users: &'a dyn UserDirectory,
    require_verified_email: bool,
}

impl<'a> SessionValidator<'a> {
    /// Creates a validator backed by the given collaborators.
    #[must_use]
    pub fn new(policies: &'a dyn PolicyLookup, users: &'a dyn UserDirectory) -> Self {
        Self {
            policies,
            users,
            require_verified_email: false,
        }
    }

    /// Requires human users to have a verified email address.
    #[must_use]
    pub fn require_verified_email(mut self, enabled: bool) -> Self {
        self.require_verified_email = enabled;
        self
    }

    /// Returns true if the session is usable right now.
    pub async fn is_valid(&self, session: &SessionRecord) -> bool {
        self.is_valid_at(session, Utc::now()).await
    }

    /// Returns true if the session is usable at `now`.
    pub async fn is_valid_at(&self, session: &SessionRecord, now: DateTime<Utc>) -> bool {
        let Some(user) = session.user() else {
            warn!(session_id = %session.id, "session has no user");
            return false;
        };

        let mfa_valid = match self.mfa_satisfied(session, user).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(session_id = %session.id, user_id = %user.id, error = %e, "could not evaluate mfa policy");
                return false;
            }
        };

        let valid_checks = session.factors.any_verified(&Factor::PRIMARY);

        let still_valid = session.is_active_at(now);
        if !still_valid {
            warn!(
                session_id = %session.id,
                expiration_date = ?session.expiration_date,
                "session is expired"
            );
        }

        if !(still_valid && valid_checks && mfa_valid) {
            debug!(
                session_id = %session.id,
                still_valid,
                valid_checks,
                mfa_valid,
                "session rejected"
            );
            return false;
        }

        if self.require_verified_email {
            return self.email_verified(session, user).await;
        }

        true
    }

    async fn mfa_satisfied(
        &self,
        session: &SessionRecord,
        user: &SessionUser,
    ) -> Result<bool, ApiError> {
        let methods = self
            .policies
            .list_authentication_method_types(&user.id)
            .await?;

        if let Some(factor) = required_second_factor(&methods) {
            return Ok(session.factors.is_verified(factor));
        }

        let settings = self
            .policies
            .get_login_settings(Some(&user.organization_id))
            .await?;

        if !settings.requires_mfa() {
            return Ok(true);
        }

        // Intent counts here although it is a primary factor.
        let verified = session.factors.any_verified(&Factor::FORCED_MFA);
        if !verified {
            warn!(session_id = %session.id, user_id = %user.id, "session has no valid multifactor");
        }
        Ok(verified)
    }

    async fn email_verified(&self, session: &SessionRecord, user: &SessionUser) -> bool {
        match self.users.get_user(&user.id).await {
            Ok(profile) if profile.has_unverified_email() => {
                warn!(
                    session_id = %session.id,
                    user_id = %user.id,
                    "session invalid: email not verified"
                );
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "could not load user for email verification");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionUser;
    use crate::policy::LoginSettings;
    use crate::testing::{FakePolicies, FakeUsers};
    use chrono::Duration;

    fn user() -> SessionUser {
        SessionUser::new("u1", "alice@acme.test", "org1")
    }

    fn password_session() -> SessionRecord {
        let now = Utc::now();
        SessionRecord::new("s1")
            .with_user(user())
            .with_factor(Factor::Password, now)
            .with_expiration_date(now + Duration::hours(1))
    }

    #[test]
    fn priority_prefers_totp_over_otp_email() {
        let methods: AuthMethodSet = [AuthMethodType::OtpEmail, AuthMethodType::Totp]
            .into_iter()
            .collect();
        assert_eq!(required_second_factor(&methods), Some(Factor::Totp));
    }

    #[test]
    fn u2f_maps_to_webauthn() {
        let methods: AuthMethodSet = [AuthMethodType::U2f, AuthMethodType::Password]
            .into_iter()
            .collect();
        assert_eq!(required_second_factor(&methods), Some(Factor::WebAuthN));
    }

    #[test]
    fn no_second_factor_registered() {
        let methods: AuthMethodSet = [AuthMethodType::Password, AuthMethodType::Passkey]
            .into_iter()
            .collect();
        assert_eq!(required_second_factor(&methods), None);
    }

    #[tokio::test]
    async fn session_without_user_is_invalid() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let session = SessionRecord::new("s1").with_factor(Factor::Password, Utc::now());
        assert!(!validator.is_valid(&session).await);
        assert_eq!(policies.method_calls(), 0);
    }

    #[tokio::test]
    async fn password_session_without_mfa_policy_is_valid() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        assert!(validator.is_valid(&password_session()).await);
    }

    #[tokio::test]
    async fn session_without_expiration_is_valid() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let session = SessionRecord::new("s1")
            .with_user(user())
            .with_factor(Factor::Password, Utc::now());
        assert!(validator.is_valid(&session).await);
    }

    #[tokio::test]
    async fn expired_session_is_invalid_regardless_of_factors() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let now = Utc::now();
        let session = SessionRecord::new("s1")
            .with_user(user())
            .with_factor(Factor::Password, now)
            .with_factor(Factor::WebAuthN, now)
            .with_factor(Factor::Totp, now)
            .with_factor(Factor::Intent, now)
            .with_expiration_date(now - Duration::hours(1));
        assert!(!validator.is_valid(&session).await);
    }

    #[tokio::test]
    async fn session_without_primary_factor_is_invalid() {
        let policies = FakePolicies::default().with_methods([AuthMethodType::Totp]);
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let session = SessionRecord::new("s1")
            .with_user(user())
            .with_factor(Factor::Totp, Utc::now());
        assert!(!validator.is_valid(&session).await);
    }

    #[tokio::test]
    async fn registered_totp_must_be_verified() {
        let policies = FakePolicies::default().with_methods([AuthMethodType::Totp]);
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        assert!(!validator.is_valid(&password_session()).await);

        let with_totp = password_session().with_factor(Factor::Totp, Utc::now());
        assert!(validator.is_valid(&with_totp).await);
    }

    #[tokio::test]
    async fn only_highest_priority_method_counts() {
        let policies = FakePolicies::default()
            .with_methods([AuthMethodType::Totp, AuthMethodType::OtpEmail]);
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let email_only = password_session().with_factor(Factor::OtpEmail, Utc::now());
        assert!(!validator.is_valid(&email_only).await);
    }

    #[tokio::test]
    async fn registered_second_factor_skips_policy_lookup() {
        let policies = FakePolicies::default().with_methods([AuthMethodType::OtpSms]);
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let session = password_session().with_factor(Factor::OtpSms, Utc::now());
        assert!(validator.is_valid(&session).await);
        assert_eq!(policies.settings_calls(), 0);
    }

    #[tokio::test]
    async fn forced_mfa_without_second_factor_is_invalid() {
        let policies = FakePolicies::default().with_settings(LoginSettings {
            force_mfa: true,
            ..LoginSettings::default()
        });
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        assert!(!validator.is_valid(&password_session()).await);
    }

    #[tokio::test]
    async fn forced_mfa_accepts_any_verified_second_factor() {
        let policies = FakePolicies::default().with_settings(LoginSettings {
            force_mfa_local_only: true,
            ..LoginSettings::default()
        });
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let session = password_session().with_factor(Factor::WebAuthN, Utc::now());
        assert!(validator.is_valid(&session).await);
    }

    #[tokio::test]
    async fn forced_mfa_accepts_idp_intent() {
        let policies = FakePolicies::default().with_settings(LoginSettings {
            force_mfa: true,
            ..LoginSettings::default()
        });
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        let now = Utc::now();
        let session = SessionRecord::new("s1")
            .with_user(user())
            .with_factor(Factor::Intent, now);
        assert!(validator.is_valid(&session).await);
    }

    #[tokio::test]
    async fn policy_lookup_failure_is_invalid() {
        let policies = FakePolicies::default().failing();
        let users = FakeUsers::default();
        let validator = SessionValidator::new(&policies, &users);

        assert!(!validator.is_valid(&password_session()).await);
    }

    #[tokio::test]
    async fn unverified_email_is_invalid_when_enforced() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default().with_email_verified("u1", false);

        let relaxed = SessionValidator::new(&policies, &users);
        assert!(relaxed.is_valid(&password_session()).await);
        assert_eq!(users.get_calls(), 0);

        let strict = SessionValidator::new(&policies, &users).require_verified_email(true);
        assert!(!strict.is_valid(&password_session()).await);
    }

    #[tokio::test]
    async fn verified_email_is_valid_when_enforced() {
        let policies = FakePolicies::default();
        let users = FakeUsers::default().with_email_verified("u1", true);
        let validator = SessionValidator::new(&policies, &users).require_verified_email(true);

        assert!(validator.is_valid(&password_session()).await);
    }
}
