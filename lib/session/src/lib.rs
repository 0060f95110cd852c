//! Sessions, login policy and session validity for authflow.
//!
//! This crate provides:
//! - Session records and their checked factors (`SessionRecord`, `Factor`)
//! - The browser's sessions cookie (`SessionCookies`)
//! - Login policy and registered auth methods (`LoginSettings`, `AuthMethodSet`)
//! - Collaborator traits for the session, policy and user services
//! - The session validity evaluator and the session selector
//!
//! # Example
//!
//! ```
//! use authflow_session::{Factor, SessionRecord, SessionUser};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let session = SessionRecord::new("231965491734773762")
//!     .with_user(SessionUser::new("u1", "alice@acme.test", "org1"))
//!     .with_factor(Factor::Password, now)
//!     .with_expiration_date(now + Duration::hours(12));
//!
//! assert!(session.is_active_at(now));
//! assert!(session.factors.any_verified(&Factor::PRIMARY));
//! ```

pub mod cookie;
pub mod model;
pub mod policy;
pub mod selector;
pub mod store;
pub mod user;
pub mod validity;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use cookie::{CookieError, SESSIONS_COOKIE, SessionCookie, SessionCookies};
pub use model::{Factor, SessionFactors, SessionRecord, SessionUser};
pub use policy::{AuthMethodSet, AuthMethodType, LoginSettings, PasskeysType, PolicyLookup};
pub use selector::{SelectionHints, find_valid_session, rank_sessions};
pub use store::SessionStore;
pub use user::{HumanProfile, UserDirectory, UserProfile, UserQuery, UserState};
pub use validity::{MFA_PRIORITY, SessionValidator, required_second_factor};
