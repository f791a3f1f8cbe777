//! Invitation email delivery.
//!
//! Mail dispatch is a best-effort side effect of sending an invitation:
//! a failure is reported to the caller and logged, but never rolls back
//! the invitation row. There is no retry queue.

mod templates;

#[cfg(feature = "smtp")]
mod smtp;

pub use templates::InviteEmailContent;

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

use async_trait::async_trait;
use thiserror::Error;

/// Email sending error.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Everything an invitation notification needs.
#[derive(Debug, Clone)]
pub struct InviteEmail {
    /// Recipient address (the invitee).
    pub to: String,
    /// Name of the inviting organization.
    pub organization_name: String,
    /// Display name of who sent the invitation.
    pub inviter_name: String,
    /// Name of the role being offered.
    pub role_name: String,
    /// Acceptance link; the embedded invitation id is the credential.
    pub accept_url: String,
}

/// Trait for invitation mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver an invitation notification.
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), MailerError>;
}

/// A mailer that records sent emails instead of delivering them.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: std::sync::Arc<std::sync::Mutex<Vec<InviteEmail>>>,
    failing: bool,
}

#[cfg(any(test, feature = "mocks"))]
impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, for exercising dispatch-failure
    /// paths.
    pub fn failing() -> Self {
        Self {
            sent: std::sync::Arc::default(),
            failing: true,
        }
    }

    /// Everything sent through this mailer so far.
    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(any(test, feature = "mocks"))]
#[async_trait]
impl Mailer for MockMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), MailerError> {
        if self.failing {
            return Err(MailerError::SendFailed("mock mailer set to fail".into()));
        }
        self.sent
            .lock()
            .map_err(|_| MailerError::SendFailed("lock poisoned".into()))?
            .push(email.clone());
        Ok(())
    }
}
