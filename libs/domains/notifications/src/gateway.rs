//! Delivery gateway.
//!
//! Sends rendered emails through the configured provider, or logs them when
//! no delivery credential is configured (dry-run mode). `send` never returns
//! an error: failures are logged and reported as `DeliveryReport::Failed`.
//! Nothing is retried or queued.

use core_config::email::EmailDeliveryConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::providers::{EmailContent, EmailProvider, SendGridProvider};

/// What happened to one outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReport {
    /// Accepted by the provider.
    Sent { message_id: Option<String> },
    /// No credential configured; logged instead of sent.
    DryRun,
    /// Provider rejected or errored. Swallowed.
    Failed { error: String },
}

impl DeliveryReport {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryReport::Sent { .. })
    }
}

pub struct DeliveryGateway {
    config: EmailDeliveryConfig,
    provider: Option<Arc<dyn EmailProvider>>,
}

impl DeliveryGateway {
    /// Build the gateway from process configuration: SendGrid when an API
    /// key is present, dry-run otherwise.
    pub fn from_config(config: EmailDeliveryConfig) -> Self {
        let provider = config.api_key.as_ref().map(|key| {
            Arc::new(SendGridProvider::with_api_url(key.clone(), config.api_url.clone()))
                as Arc<dyn EmailProvider>
        });
        Self { config, provider }
    }

    /// Use a specific provider. The provider is only called when the
    /// configuration carries a credential; without one the gateway stays in
    /// dry-run mode.
    pub fn with_provider(config: EmailDeliveryConfig, provider: Arc<dyn EmailProvider>) -> Self {
        let provider = config.is_live().then_some(provider);
        Self { config, provider }
    }

    pub fn is_dry_run(&self) -> bool {
        self.provider.is_none()
    }

    pub fn config(&self) -> &EmailDeliveryConfig {
        &self.config
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> DeliveryReport {
        let Some(provider) = &self.provider else {
            info!(to = %to, subject = %subject, "Email delivery not configured, logging instead of sending");
            return DeliveryReport::DryRun;
        };

        let email = EmailContent {
            to: to.to_string(),
            from: self.config.from_email.clone(),
            from_name: Some(self.config.from_name.clone()),
            subject: subject.to_string(),
            html: html.to_string(),
            text: text.to_string(),
        };

        match provider.send(&email).await {
            Ok(sent) => {
                info!(
                    to = %to,
                    subject = %subject,
                    provider = provider.name(),
                    message_id = ?sent.message_id,
                    "Email sent"
                );
                DeliveryReport::Sent {
                    message_id: sent.message_id,
                }
            }
            Err(e) => {
                error!(
                    to = %to,
                    subject = %subject,
                    provider = provider.name(),
                    error = %e,
                    "Error sending email"
                );
                DeliveryReport::Failed { error: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmailProvider;

    fn live_config() -> EmailDeliveryConfig {
        EmailDeliveryConfig::dry_run().with_api_key("SG.test")
    }

    #[tokio::test]
    async fn test_live_send_uses_configured_sender() {
        let provider = MockEmailProvider::new();
        let gateway = DeliveryGateway::with_provider(
            live_config().with_from_email("classes@school.edu"),
            Arc::new(provider.clone()),
        );

        let report = gateway.send("a@x.com", "Subject", "<p>Hi</p>", "Hi").await;
        assert_eq!(
            report,
            DeliveryReport::Sent {
                message_id: Some("mock-1".to_string())
            }
        );

        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "classes@school.edu");
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].html, "<p>Hi</p>");
        assert_eq!(sent[0].text, "Hi");
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_provider() {
        let provider = MockEmailProvider::new();
        let gateway =
            DeliveryGateway::with_provider(EmailDeliveryConfig::dry_run(), Arc::new(provider.clone()));

        assert!(gateway.is_dry_run());
        let report = gateway.send("a@x.com", "Subject", "<p>Hi</p>", "Hi").await;
        assert_eq!(report, DeliveryReport::DryRun);
        assert_eq!(provider.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_swallowed() {
        let gateway = DeliveryGateway::with_provider(
            live_config(),
            Arc::new(MockEmailProvider::failing("401 Unauthorized")),
        );

        let report = gateway.send("a@x.com", "Subject", "", "").await;
        match report {
            DeliveryReport::Failed { error } => assert!(error.contains("401 Unauthorized")),
            other => panic!("expected failure report, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_selects_mode() {
        assert!(DeliveryGateway::from_config(EmailDeliveryConfig::dry_run()).is_dry_run());
        assert!(!DeliveryGateway::from_config(live_config()).is_dry_run());
    }

    #[test]
    fn test_report_serialization() {
        assert_eq!(
            serde_json::to_value(DeliveryReport::DryRun).unwrap(),
            serde_json::json!({"status": "dry_run"})
        );
    }
}
