//! Session authentication gate.
//!
//! A process-wide boolean would make independent instances impossible to
//! test, so the gate is an explicit object owned by the [`crate::session::Session`]
//! and shared via `Arc` with whoever needs to consult it.
//!
//! Denied checks are invisible to the user; the audit trail is the only
//! record that a protected command was attempted while logged out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Most recent audit entries kept in memory.
const AUDIT_CAP: usize = 200;

/// One auth decision, recorded by [`AuthGate::check`].
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: String,
    pub allowed: bool,
    pub at: DateTime<Utc>,
}

/// Boolean session flag gating post-login voice commands.
pub struct AuthGate {
    logged_in: AtomicBool,
    audit: Mutex<Vec<AuditEntry>>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self {
            logged_in: AtomicBool::new(false),
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Transition session state. Called by the external login/logout flow;
    /// nothing inside this crate flips the flag on its own.
    pub fn set(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
        info!(logged_in, "auth state changed");
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Check whether a protected action may run, recording the decision.
    pub fn check(&self, action: &str) -> bool {
        let allowed = self.is_logged_in();

        let entry = AuditEntry {
            action: action.to_string(),
            allowed,
            at: Utc::now(),
        };
        {
            let mut audit = self.audit.lock().unwrap_or_else(|e| e.into_inner());
            audit.push(entry);
            if audit.len() > AUDIT_CAP {
                let excess = audit.len() - AUDIT_CAP;
                audit.drain(..excess);
            }
        }

        if allowed {
            debug!(action, "auth check passed");
        } else {
            warn!(action, "auth check denied: not logged in");
        }
        allowed
    }

    /// Snapshot of the recorded audit trail, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}
