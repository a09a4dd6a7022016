//! Role-based access guard for protected views

use std::sync::Arc;

use tracing::debug;

use crate::role::Role;
use crate::session::SessionContext;

/// Result of a guard check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The marker matches; the view may render and load its data
    Allow,
    /// Render nothing and go to this route
    Redirect(String),
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}

/// Checks the persisted role marker once per view mount.
///
/// The check is local and synchronous. There is no retry: a mismatch is a
/// redirect, not an error.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    session: Arc<SessionContext>,
    required: Role,
}

impl AccessGuard {
    pub fn new(session: Arc<SessionContext>, required: Role) -> Self {
        AccessGuard { session, required }
    }

    pub fn required_role(&self) -> Role {
        self.required
    }

    pub fn check(&self) -> GuardOutcome {
        match self.session.role() {
            Some(role) if role == self.required => GuardOutcome::Allow,
            found => {
                debug!(required = %self.required, ?found, "role mismatch, redirecting");
                GuardOutcome::Redirect(self.required.login_path())
            }
        }
    }

    /// Clear the session and return the login route for this view's role
    pub fn logout(&self) -> String {
        self.session.logout(self.required)
    }
}
