//! Continuation of OIDC authorization requests for authflow.
//!
//! This crate provides:
//! - The authorization request model and its scope hints
//! - Collaborator traits for the OIDC layer, organizations and identity providers
//! - Login name continuation (`LoginNameResolver`)
//! - The router deciding where the browser goes next (`AuthRequestRouter`)
//!
//! # Example
//!
//! ```
//! use authflow_continuation::{ScopeHints, decision::loginname_page};
//! use authflow_core::AuthRequestId;
//!
//! let hints = ScopeHints::parse(&["openid", "urn:zitadel:iam:org:idp:id:google"]);
//! assert_eq!(hints.idp_id.map(|id| id.into_inner()), Some("google".to_string()));
//!
//! let page = loginname_page(&AuthRequestId::new("ar1"), None, true, None);
//! assert_eq!(page, "/loginname?authRequestId=ar1");
//! ```

pub mod decision;
pub mod error;
pub mod idp;
pub mod loginname;
pub mod oidc;
pub mod org;
pub mod request;
pub mod router;
pub mod scope;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use decision::{Decision, FlowStatus};
pub use error::{FlowError, FlowResult};
pub use idp::{
    IdentityProvider, IdentityProviderRegistry, IdentityProviderType, IdpFlowUrls, IdpNextStep,
};
pub use loginname::{
    LoginNameOutcome, LoginNameResolver, LoginNameService, OnFailure, SendLoginName,
};
pub use oidc::{CallbackResponse, OidcBackend, SessionCallback};
pub use org::{Organization, OrganizationDirectory};
pub use request::{AuthorizationRequest, Prompt};
pub use router::{AuthRequestRouter, FlowServices, RouteInput, RouterOptions};
pub use scope::{OrganizationScope, ScopeHints};
