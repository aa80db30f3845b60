//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while turning a notification into an email.
///
/// Skips (unknown type, missing related entity, no recipient) are not errors;
/// they are reported through `DispatchOutcome::Skipped`.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// User record referenced by the notification (or an announcement author) is absent.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Course referenced by the related entity is absent.
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    /// Score data cannot produce a percentage.
    #[error("Invalid score {score}/{total}: total must be greater than zero")]
    InvalidScore { score: u32, total: u32 },

    /// Document store transport or status error.
    #[error("Document store error: {0}")]
    Store(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// Email provider error.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Payload or document could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Serialization(err.to_string())
    }
}
