//! Picks the session that satisfies an authorization request.

use authflow_core::UserId;
use tracing::debug;

use crate::model::SessionRecord;
use crate::validity::SessionValidator;

/// Identity hints carried by an authorization request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionHints<'a> {
    /// Explicit user the request was issued for.
    pub user_id: Option<&'a UserId>,
    /// Login name hint (`login_hint`).
    pub login_name: Option<&'a str>,
}

impl SelectionHints<'_> {
    /// Returns true if the session matches the hints.
    ///
    /// An explicit user ID takes precedence over the login name.
    #[must_use]
    pub fn matches(&self, session: &SessionRecord) -> bool {
        if let Some(user_id) = self.user_id {
            return session.user().is_some_and(|u| &u.id == user_id);
        }
        if let Some(login_name) = self.login_name {
            return session.user().is_some_and(|u| u.login_name == login_name);
        }
        true
    }
}

/// Orders sessions by change date, most recent first.
///
/// The sort is stable: sessions with equal (or missing) change dates keep
/// their input order.
#[must_use]
pub fn rank_sessions<'s>(
    sessions: &'s [SessionRecord],
    hints: &SelectionHints<'_>,
) -> Vec<&'s SessionRecord> {
    let mut candidates: Vec<&SessionRecord> =
        sessions.iter().filter(|s| hints.matches(s)).collect();
    candidates.sort_by(|a, b| b.ordering_date().cmp(&a.ordering_date()));
    candidates
}

/// Returns the most recently changed session that matches the hints and is
/// valid, or `None` if there is none.
pub async fn find_valid_session(
    validator: &SessionValidator<'_>,
    sessions: &[SessionRecord],
    hints: &SelectionHints<'_>,
) -> Option<SessionRecord> {
    let candidates = rank_sessions(sessions, hints);
    if candidates.is_empty() {
        debug!(total = sessions.len(), "no session matches the request hints");
        return None;
    }

    for session in candidates {
        if validator.is_valid(session).await {
            return Some(session.clone());
        }
    }

    debug!("no valid session found");
    None
}
