//! Organization and identity provider hints encoded in OIDC scopes.

use authflow_core::{IdpId, OrganizationId};

/// Scope prefix selecting an organization by ID.
pub const ORG_ID_SCOPE_PREFIX: &str = "urn:zitadel:iam:org:id:";
/// Scope prefix selecting an organization by its primary domain.
pub const ORG_DOMAIN_SCOPE_PREFIX: &str = "urn:zitadel:iam:org:domain:primary:";
/// Scope prefix selecting an identity provider by ID.
pub const IDP_SCOPE_PREFIX: &str = "urn:zitadel:iam:org:idp:id:";

/// Organization scope requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationScope {
    /// Organization given by ID.
    Id(OrganizationId),
    /// Organization given by primary domain; must be resolved.
    Domain(String),
}

/// Hints parsed from the scopes of an authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeHints {
    pub organization: Option<OrganizationScope>,
    pub idp_id: Option<IdpId>,
}

impl ScopeHints {
    /// Parses the scopes.
    ///
    /// The first organization ID scope wins; a domain scope is only used
    /// when no ID scope is present. Organization IDs are numeric.
    #[must_use]
    pub fn parse<S: AsRef<str>>(scopes: &[S]) -> Self {
        let org_id = scopes.iter().find_map(|s| parse_org_id(s.as_ref()));

        let organization = match org_id {
            Some(id) => Some(OrganizationScope::Id(id)),
            None => scopes
                .iter()
                .find_map(|s| non_empty_suffix(s.as_ref(), ORG_DOMAIN_SCOPE_PREFIX))
                .map(|domain| OrganizationScope::Domain(domain.to_string())),
        };

        let idp_id = scopes
            .iter()
            .find_map(|s| non_empty_suffix(s.as_ref(), IDP_SCOPE_PREFIX))
            .map(IdpId::from);

        Self {
            organization,
            idp_id,
        }
    }
}

fn non_empty_suffix<'s>(scope: &'s str, prefix: &str) -> Option<&'s str> {
    scope.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

fn parse_org_id(scope: &str) -> Option<OrganizationId> {
    let rest = scope.strip_prefix(ORG_ID_SCOPE_PREFIX)?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() {
        None
    } else {
        Some(OrganizationId::new(digits))
    }
}
