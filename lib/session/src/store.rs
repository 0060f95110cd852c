//! Read access to the session service.

use async_trait::async_trait;
use authflow_core::{ApiError, SessionId};

use crate::model::SessionRecord;

/// Looks up session records by ID.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session records for the given IDs.
    ///
    /// Unknown IDs are skipped; the result may be shorter than `ids`.
    async fn list_sessions(&self, ids: &[SessionId]) -> Result<Vec<SessionRecord>, ApiError>;
}
