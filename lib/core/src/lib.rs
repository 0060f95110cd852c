//! Core identifier types and utilities for authflow.
//!
//! This crate provides the strongly-typed identifiers and the `Result` alias
//! shared by the session, continuation and server crates.

pub mod error;
pub mod id;

pub use error::{ApiError, Result};
pub use id::{AuthRequestId, IdpId, OrganizationId, ParseIdError, SessionId, UserId};
