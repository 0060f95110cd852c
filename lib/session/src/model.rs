//! Session records as returned by the session service.
//!
//! A session represents a previously established browser session. It is
//! independent of any single authorization request and carries the
//! verification timestamp of every factor the user has passed in it.

use authflow_core::{OrganizationId, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user a session has been bound to by a user check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// The user's ID.
    pub id: UserId,
    /// The login name the user was checked with.
    pub login_name: String,
    /// Display name, if the platform returned one.
    pub display_name: Option<String>,
    /// The organization the user belongs to.
    pub organization_id: OrganizationId,
}

impl SessionUser {
    /// Creates a session user.
    #[must_use]
    pub fn new(
        id: impl Into<UserId>,
        login_name: impl Into<String>,
        organization_id: impl Into<OrganizationId>,
    ) -> Self {
        Self {
            id: id.into(),
            login_name: login_name.into(),
            display_name: None,
            organization_id: organization_id.into(),
        }
    }
}

/// A verification factor that can be checked on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Username and password.
    Password,
    /// Passkey or U2F security key.
    WebAuthN,
    /// Time-based one-time password.
    Totp,
    /// One-time password sent by email.
    OtpEmail,
    /// One-time password sent by SMS.
    OtpSms,
    /// Successful login at an external identity provider.
    Intent,
}

impl Factor {
    /// Factors that count as a primary authentication.
    pub const PRIMARY: [Self; 3] = [Self::Password, Self::WebAuthN, Self::Intent];

    /// Factors accepted when an organization forces MFA on a user without
    /// any registered second factor.
    pub const FORCED_MFA: [Self; 5] = [
        Self::OtpEmail,
        Self::OtpSms,
        Self::Totp,
        Self::WebAuthN,
        Self::Intent,
    ];
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Password => "password",
            Self::WebAuthN => "webauthn",
            Self::Totp => "totp",
            Self::OtpEmail => "otp_email",
            Self::OtpSms => "otp_sms",
            Self::Intent => "intent",
        };
        f.write_str(name)
    }
}

/// Checked factors of a session.
///
/// Every factor is independently optional; a present timestamp means the
/// factor was verified at that time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFactors {
    pub user: Option<SessionUser>,
    pub password: Option<DateTime<Utc>>,
    pub web_auth_n: Option<DateTime<Utc>>,
    pub totp: Option<DateTime<Utc>>,
    pub otp_email: Option<DateTime<Utc>>,
    pub otp_sms: Option<DateTime<Utc>>,
    pub intent: Option<DateTime<Utc>>,
}

impl SessionFactors {
    /// Returns when the given factor was verified, if it was.
    #[must_use]
    pub fn verified_at(&self, factor: Factor) -> Option<DateTime<Utc>> {
        match factor {
            Factor::Password => self.password,
            Factor::WebAuthN => self.web_auth_n,
            Factor::Totp => self.totp,
            Factor::OtpEmail => self.otp_email,
            Factor::OtpSms => self.otp_sms,
            Factor::Intent => self.intent,
        }
    }

    /// Returns true if the given factor was verified.
    #[must_use]
    pub fn is_verified(&self, factor: Factor) -> bool {
        self.verified_at(factor).is_some()
    }

    /// Returns true if any of the given factors was verified.
    #[must_use]
    pub fn any_verified(&self, factors: &[Factor]) -> bool {
        factors.iter().any(|factor| self.is_verified(*factor))
    }

    fn slot_mut(&mut self, factor: Factor) -> &mut Option<DateTime<Utc>> {
        match factor {
            Factor::Password => &mut self.password,
            Factor::WebAuthN => &mut self.web_auth_n,
            Factor::Totp => &mut self.totp,
            Factor::OtpEmail => &mut self.otp_email,
            Factor::OtpSms => &mut self.otp_sms,
            Factor::Intent => &mut self.intent,
        }
    }
}

/// A session record read from the session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique identifier for this session.
    pub id: SessionId,
    /// When the session was last changed.
    pub change_date: Option<DateTime<Utc>>,
    /// When the session expires. `None` means it never expires.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Checked factors.
    pub factors: SessionFactors,
}

impl SessionRecord {
    /// Creates an empty session without user or factors.
    #[must_use]
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            change_date: None,
            expiration_date: None,
            factors: SessionFactors::default(),
        }
    }

    /// Sets the user the session is bound to.
    #[must_use]
    pub fn with_user(mut self, user: SessionUser) -> Self {
        self.factors.user = Some(user);
        self
    }

    /// Marks a factor as verified at the given time.
    #[must_use]
    pub fn with_factor(mut self, factor: Factor, verified_at: DateTime<Utc>) -> Self {
        *self.factors.slot_mut(factor) = Some(verified_at);
        self
    }

    /// Sets the last change date.
    #[must_use]
    pub fn with_change_date(mut self, change_date: DateTime<Utc>) -> Self {
        self.change_date = Some(change_date);
        self
    }

    /// Sets the expiration date.
    #[must_use]
    pub fn with_expiration_date(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Returns the user bound to the session.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.factors.user.as_ref()
    }

    /// Returns true if the session is still usable at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.is_none_or(|expires| expires > now)
    }

    /// Returns the change date used for ordering; a missing date sorts as
    /// the epoch.
    #[must_use]
    pub fn ordering_date(&self) -> DateTime<Utc> {
        self.change_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}
