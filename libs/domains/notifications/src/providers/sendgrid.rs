//! SendGrid email provider implementation.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::email::DEFAULT_SENDGRID_API_URL;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// SendGrid email provider.
pub struct SendGridProvider {
    api_key: String,
    api_url: String,
    client: Client,
}

impl SendGridProvider {
    /// Create a provider against the public v3 API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_url(api_key, DEFAULT_SENDGRID_API_URL)
    }

    /// Create a provider against a custom base URL (sandbox, proxy).
    pub fn with_api_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/mail/send", self.api_url)
    }
}

// SendGrid API request/response structures

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendGridError {
    errors: Vec<SendGridErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorDetail {
    message: String,
}

impl SendGridRequest {
    fn from_content(email: &EmailContent) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: email.to.clone(),
                    name: None,
                }],
            }],
            from: EmailAddress {
                email: email.from.clone(),
                name: email.from_name.clone(),
            },
            subject: email.subject.clone(),
            // SendGrid requires text/plain before text/html
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: email.text.clone(),
                },
                Content {
                    content_type: "text/html",
                    value: email.html.clone(),
                },
            ],
        }
    }
}

/// Flatten a SendGrid error body into a readable message.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<SendGridError>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join(", "),
        _ => body.to_string(),
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let request = SendGridRequest::from_content(email);

        debug!(to = %email.to, subject = %email.subject, "Sending email via SendGrid");

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::ProviderError(e.to_string()))?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_success() {
            return Ok(SentEmail { message_id });
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(NotificationError::ProviderError(format!(
            "SendGrid error ({}): {}",
            status,
            describe_error(&error_body)
        )))
    }

    fn name(&self) -> &'static str {
        "SendGrid"
    }
}
