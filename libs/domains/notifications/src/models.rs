//! Data models for the notifications domain.
//!
//! Every entity here is a read-only snapshot of a document owned by another
//! part of the platform. Wire names are camelCase to match the stored documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Notification
// ============================================================================

/// Kind of event a notification describes.
///
/// Unknown values are preserved in `Unrecognized` so they can be logged and
/// skipped instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Announcement,
    AssignmentSubmitted,
    AssignmentGraded,
    QuizSubmitted,
    QuizGraded,
    Unrecognized(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Announcement => "announcement",
            NotificationType::AssignmentSubmitted => "assignmentSubmitted",
            NotificationType::AssignmentGraded => "assignmentGraded",
            NotificationType::QuizSubmitted => "quizSubmitted",
            NotificationType::QuizGraded => "quizGraded",
            NotificationType::Unrecognized(raw) => raw,
        }
    }

    /// Collection the notification's `relatedId` points into, if any.
    pub fn related_kind(&self) -> Option<RelatedKind> {
        match self {
            NotificationType::Announcement => Some(RelatedKind::Announcement),
            NotificationType::AssignmentSubmitted | NotificationType::AssignmentGraded => {
                Some(RelatedKind::Assignment)
            }
            NotificationType::QuizSubmitted | NotificationType::QuizGraded => Some(RelatedKind::Quiz),
            NotificationType::Unrecognized(_) => None,
        }
    }
}

impl From<String> for NotificationType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "announcement" => NotificationType::Announcement,
            "assignmentSubmitted" => NotificationType::AssignmentSubmitted,
            "assignmentGraded" => NotificationType::AssignmentGraded,
            "quizSubmitted" => NotificationType::QuizSubmitted,
            "quizGraded" => NotificationType::QuizGraded,
            _ => NotificationType::Unrecognized(raw),
        }
    }
}

impl From<&str> for NotificationType {
    fn from(raw: &str) -> Self {
        NotificationType::from(raw.to_string())
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain object a notification refers to through `relatedId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedKind {
    Announcement,
    Assignment,
    Quiz,
}

impl fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedKind::Announcement => write!(f, "announcement"),
            RelatedKind::Assignment => write!(f, "assignment"),
            RelatedKind::Quiz => write!(f, "quiz"),
        }
    }
}

/// A newly created notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Document id, when the host supplies it. Only used for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub related_id: String,
    /// Free text shown in-app; attempt and score numbers are mined from it.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    /// Only feeds the displayed timestamp. Unreadable values become `None`.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,

    // Structured values take precedence over the numbers mined from `message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: impl Into<NotificationType>,
        related_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            notification_type: notification_type.into(),
            related_id: related_id.into(),
            message: message.into(),
            created_at: None,
            attempt_number: None,
            score: None,
            total: None,
            feedback: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Structured score pair, only when both halves are present.
    pub fn structured_score(&self) -> Option<(u32, u32)> {
        self.score.zip(self.total)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

/// Accepts RFC 3339 strings, epoch milliseconds and `{seconds, nanos}`
/// objects (both the `_seconds` admin-SDK shape and the protobuf shape).
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        Value::Number(_) => as_i64(value).and_then(DateTime::from_timestamp_millis),
        Value::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(as_i64)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanos"))
                .and_then(as_i64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

// Protobuf JSON encodes int64 as a string.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Related documents
// ============================================================================

/// Fallback greeting name for users without a display name.
pub const DEFAULT_STUDENT_NAME: &str = "Student";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Filled from the document id by the resolver.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl User {
    /// Deliverable address, ignoring blank values.
    pub fn recipient(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_STUDENT_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub course_id: String,
    /// Instructor user id
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub title: String,
    pub course_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    pub course_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_deserialize_camel_case() {
        let notification: Notification = serde_json::from_value(json!({
            "userId": "u1",
            "type": "quizSubmitted",
            "relatedId": "q1",
            "message": "Score: 8/10",
            "createdAt": "2025-03-01T14:30:00Z"
        }))
        .unwrap();

        assert_eq!(notification.user_id, "u1");
        assert_eq!(notification.notification_type, NotificationType::QuizSubmitted);
        assert_eq!(notification.related_id, "q1");
        assert!(notification.created_at.is_some());
        assert_eq!(notification.structured_score(), None);
    }

    fn created_at_of(created_at: Value) -> Option<DateTime<Utc>> {
        let notification: Notification = serde_json::from_value(json!({
            "userId": "u1",
            "type": "quizSubmitted",
            "createdAt": created_at
        }))
        .unwrap();
        notification.created_at
    }

    #[test]
    fn test_created_at_accepts_common_shapes() {
        let expected = DateTime::parse_from_rfc3339("2025-03-01T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(created_at_of(json!("2025-03-01T14:30:00Z")), Some(expected));
        assert_eq!(created_at_of(json!(1740839400000_i64)), Some(expected));
        assert_eq!(
            created_at_of(json!({"_seconds": 1740839400, "_nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(
            created_at_of(json!({"seconds": "1740839400", "nanos": 0})),
            Some(expected)
        );
    }

    #[test]
    fn test_unreadable_created_at_is_dropped() {
        assert_eq!(created_at_of(json!(null)), None);
        assert_eq!(created_at_of(json!("yesterday")), None);
        assert_eq!(created_at_of(json!(true)), None);
        assert_eq!(created_at_of(json!({"when": 1})), None);
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let notification: Notification = serde_json::from_value(json!({
            "userId": "u1",
            "type": "announcement",
            "relatedId": null,
            "message": null
        }))
        .unwrap();

        assert_eq!(notification.message, "");
        assert_eq!(notification.related_id, "");
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let notification: Notification = serde_json::from_value(json!({
            "userId": "u1",
            "type": "badgeEarned",
            "relatedId": "b1",
            "message": ""
        }))
        .unwrap();

        assert_eq!(
            notification.notification_type,
            NotificationType::Unrecognized("badgeEarned".to_string())
        );
        assert_eq!(notification.notification_type.to_string(), "badgeEarned");
        assert_eq!(notification.notification_type.related_kind(), None);
    }

    #[test]
    fn test_type_serializes_back_to_wire_name() {
        let value = serde_json::to_value(NotificationType::AssignmentGraded).unwrap();
        assert_eq!(value, json!("assignmentGraded"));
    }

    #[test]
    fn test_related_kind_mapping() {
        assert_eq!(
            NotificationType::Announcement.related_kind(),
            Some(RelatedKind::Announcement)
        );
        assert_eq!(
            NotificationType::AssignmentSubmitted.related_kind(),
            Some(RelatedKind::Assignment)
        );
        assert_eq!(
            NotificationType::AssignmentGraded.related_kind(),
            Some(RelatedKind::Assignment)
        );
        assert_eq!(NotificationType::QuizGraded.related_kind(), Some(RelatedKind::Quiz));
    }

    #[test]
    fn test_user_recipient_ignores_blank_email() {
        let user = User {
            uid: "u1".to_string(),
            email: Some("  ".to_string()),
            display_name: None,
        };
        assert_eq!(user.recipient(), None);
        assert_eq!(user.name(), DEFAULT_STUDENT_NAME);

        let user = User {
            email: Some("a@x.com".to_string()),
            display_name: Some("Ada".to_string()),
            ..user
        };
        assert_eq!(user.recipient(), Some("a@x.com"));
        assert_eq!(user.name(), "Ada");
    }
}
