//! Mock email provider for testing

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock email provider that captures sent emails
#[derive(Clone, Default)]
pub struct MockEmailProvider {
    sent_emails: Arc<Mutex<Vec<EmailContent>>>,
    failure_message: Option<String>,
}

impl MockEmailProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider that always fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent_emails: Arc::default(),
            failure_message: Some(message.into()),
        }
    }

    /// Get all successfully sent emails
    pub async fn sent_emails(&self) -> Vec<EmailContent> {
        self.sent_emails.lock().await.clone()
    }

    /// Get the count of successfully sent emails
    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    /// Check if an email was sent to a specific address
    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent_emails.lock().await.iter().any(|e| e.to == address)
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        if let Some(message) = &self.failure_message {
            return Err(NotificationError::ProviderError(message.clone()));
        }

        let mut sent = self.sent_emails.lock().await;
        sent.push(email.clone());

        Ok(SentEmail {
            message_id: Some(format!("mock-{}", sent.len())),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> EmailContent {
        EmailContent {
            to: to.to_string(),
            subject: "Test Subject".to_string(),
            text: "Test body".to_string(),
            ..EmailContent::default()
        }
    }

    #[tokio::test]
    async fn test_mock_provider_captures_email() {
        let provider = MockEmailProvider::new();

        let sent = provider.send(&email("user@example.com")).await.unwrap();
        assert_eq!(sent.message_id.as_deref(), Some("mock-1"));

        assert_eq!(provider.sent_count().await, 1);
        assert!(provider.was_sent_to("user@example.com").await);
        assert!(!provider.was_sent_to("other@example.com").await);
    }

    #[tokio::test]
    async fn test_mock_provider_fails() {
        let provider = MockEmailProvider::failing("Simulated failure");

        let err = provider.send(&email("user@example.com")).await.unwrap_err();
        assert!(err.to_string().contains("Simulated failure"));
        assert_eq!(provider.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_clones_share_captured_emails() {
        let provider = MockEmailProvider::new();
        let handle = provider.clone();

        provider.send(&email("a@x.com")).await.unwrap();
        assert_eq!(handle.sent_emails().await[0].to, "a@x.com");
    }
}
