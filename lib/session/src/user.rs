//! Users as seen by the login flow.

use async_trait::async_trait;
use authflow_core::{ApiError, OrganizationId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    #[default]
    Unspecified,
    Active,
    Inactive,
    Deleted,
    Locked,
    /// Created but never initialized by the user.
    Initial,
}

/// Contact data of a human user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanProfile {
    pub email: Option<String>,
    pub email_verified: bool,
    pub phone: Option<String>,
}

/// A user record from the user service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub preferred_login_name: String,
    pub organization_id: OrganizationId,
    pub state: UserState,
    /// Present for human users, absent for machine users.
    pub human: Option<HumanProfile>,
}

impl UserProfile {
    /// Returns true if the user is human and has not verified their email.
    ///
    /// Machine users have no email and are never reported as unverified.
    #[must_use]
    pub fn has_unverified_email(&self) -> bool {
        self.human.as_ref().is_some_and(|human| !human.email_verified)
    }

    /// Returns the human user's email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.human.as_ref().and_then(|h| h.email.as_deref())
    }

    /// Returns the human user's phone number.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.human.as_ref().and_then(|h| h.phone.as_deref())
    }
}

/// A user search by the name typed into the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// The value typed by the user.
    pub login_name: String,
    /// Restricts the search to one organization.
    pub organization_id: Option<OrganizationId>,
    /// Also match the value against email addresses.
    pub match_email: bool,
    /// Also match the value against phone numbers.
    pub match_phone: bool,
}

/// Read access to the user service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the user with the given ID.
    async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError>;

    /// Searches users matching the query.
    async fn search_users(&self, query: &UserQuery) -> Result<Vec<UserProfile>, ApiError>;
}
