//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use authflow_core::{ApiError, OrganizationId, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::policy::{AuthMethodSet, AuthMethodType, LoginSettings, PolicyLookup};
use crate::user::{HumanProfile, UserDirectory, UserProfile, UserQuery, UserState};

#[derive(Default)]
pub struct FakePolicies {
    methods: AuthMethodSet,
    settings: LoginSettings,
    fail: bool,
    method_calls: AtomicUsize,
    settings_calls: AtomicUsize,
}

impl FakePolicies {
    pub fn with_methods<const N: usize>(mut self, methods: [AuthMethodType; N]) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_settings(mut self, settings: LoginSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn method_calls(&self) -> usize {
        self.method_calls.load(Ordering::SeqCst)
    }

    pub fn settings_calls(&self) -> usize {
        self.settings_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyLookup for FakePolicies {
    async fn list_authentication_method_types(
        &self,
        _user_id: &UserId,
    ) -> Result<AuthMethodSet, ApiError> {
        self.method_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ApiError::Transport {
                details: "unavailable".to_string(),
            });
        }
        Ok(self.methods.clone())
    }

    async fn get_login_settings(
        &self,
        _organization_id: Option<&OrganizationId>,
    ) -> Result<LoginSettings, ApiError> {
        self.settings_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.clone())
    }
}

#[derive(Default)]
pub struct FakeUsers {
    users: HashMap<UserId, UserProfile>,
    get_calls: AtomicUsize,
}

impl FakeUsers {
    pub fn with_email_verified(mut self, user_id: &str, verified: bool) -> Self {
        let profile = UserProfile {
            id: UserId::new(user_id),
            preferred_login_name: format!("{user_id}@acme.test"),
            organization_id: OrganizationId::new("org1"),
            state: UserState::Active,
            human: Some(HumanProfile {
                email: Some(format!("{user_id}@acme.test")),
                email_verified: verified,
                phone: None,
            }),
        };
        self.users.insert(profile.id.clone(), profile);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("user {user_id}"),
            })
    }

    async fn search_users(&self, query: &UserQuery) -> Result<Vec<UserProfile>, ApiError> {
        Ok(self
            .users
            .values()
            .filter(|u| u.preferred_login_name == query.login_name)
            .cloned()
            .collect())
    }
}
