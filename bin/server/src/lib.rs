//! authflow login server.
//!
//! Serves the login application's entry point for OIDC authorization
//! requests and talks to the identity platform over its v2 REST API.

pub mod api;
pub mod config;
pub mod error;
pub mod routes;
