//! Organizations.

use async_trait::async_trait;
use authflow_core::{ApiError, OrganizationId};
use serde::{Deserialize, Serialize};

/// An organization of the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub primary_domain: Option<String>,
}

/// Organization lookups.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Returns the organizations whose primary domain is `domain`.
    async fn get_orgs_by_domain(&self, domain: &str) -> Result<Vec<Organization>, ApiError>;
}

/// Resolves a domain to an organization ID.
///
/// Yields `None` unless exactly one organization has the domain. Lookup
/// failures are reported to the caller.
pub async fn resolve_single_org(
    directory: &dyn OrganizationDirectory,
    domain: &str,
) -> Result<Option<OrganizationId>, ApiError> {
    let mut orgs = directory.get_orgs_by_domain(domain).await?;
    if orgs.len() == 1 {
        Ok(orgs.pop().map(|org| org.id))
    } else {
        Ok(None)
    }
}
