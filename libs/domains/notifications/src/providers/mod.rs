//! Email provider implementations.
//!
//! This module contains the `EmailProvider` trait, the SendGrid HTTP
//! implementation used in production and a capturing mock for tests and
//! local runs.

mod mock;
mod sendgrid;

pub use mock::MockEmailProvider;
pub use sendgrid::SendGridProvider;

use crate::error::NotificationResult;
use async_trait::async_trait;

/// Represents a sent email with provider-specific message ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailContent {
    /// Recipient email address.
    pub to: String,
    /// Sender email address.
    pub from: String,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Email subject.
    pub subject: String,
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
}

/// Trait for email sending providers.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;

    /// Get the provider name for logging.
    fn name(&self) -> &'static str;
}
