// Structured audit trail for authentication events

use tracing::{info, warn};

/// Authentication events worth an audit record
#[derive(Debug, Clone)]
pub enum AuthEvent {
    AuthSuccess,
    AuthFailure { reason: String },
}

/// Emits auth events as structured tracing records
///
/// Failure reasons are recorded here for operators; the HTTP response stays
/// uniform so callers cannot probe which check rejected a credential.
#[derive(Debug, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log_auth_event(&self, event: AuthEvent, subject: Option<&str>) {
        match event {
            AuthEvent::AuthSuccess => {
                info!(
                    event = "auth_success",
                    subject = subject.unwrap_or("unknown"),
                    "Authentication succeeded"
                );
            }
            AuthEvent::AuthFailure { reason } => {
                warn!(
                    event = "auth_failure",
                    subject = subject.unwrap_or("unknown"),
                    reason = %reason,
                    "Authentication failed"
                );
            }
        }
    }
}
