//! Dispatch router.
//!
//! Maps a notification's type onto the matching resolve → render → deliver
//! path. Every recognized type has its own arm; unknown types stop before any
//! store read.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::NotificationResult;
use crate::gateway::{DeliveryGateway, DeliveryReport};
use crate::mining::{self, ScorePair};
use crate::models::{Notification, NotificationType, RelatedKind, User};
use crate::resolver::EntityResolver;
use crate::store::DocumentStore;
use crate::templates::{
    AnnouncementEmailData, AssignmentGradedData, AssignmentSubmittedData, QuizResultData,
    RenderedEmail, TemplateEngine, format_timestamp,
};

/// Why a notification produced no email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    UnrecognizedType { notification_type: String },
    NoRecipient { user_id: String },
    RelatedEntityMissing { kind: RelatedKind, related_id: String },
}

/// Result of routing one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered {
        recipient: String,
        subject: String,
        report: DeliveryReport,
    },
    Skipped(SkipReason),
}

impl DispatchOutcome {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered { .. } => "delivered",
            DispatchOutcome::Skipped(SkipReason::UnrecognizedType { .. }) => "skipped_unrecognized_type",
            DispatchOutcome::Skipped(SkipReason::NoRecipient { .. }) => "skipped_no_recipient",
            DispatchOutcome::Skipped(SkipReason::RelatedEntityMissing { .. }) => {
                "skipped_related_entity_missing"
            }
        }
    }
}

pub struct NotificationDispatcher<S> {
    resolver: EntityResolver<S>,
    templates: Arc<TemplateEngine>,
    gateway: Arc<DeliveryGateway>,
}

impl<S: DocumentStore> NotificationDispatcher<S> {
    pub fn new(store: S, templates: Arc<TemplateEngine>, gateway: Arc<DeliveryGateway>) -> Self {
        Self {
            resolver: EntityResolver::new(store),
            templates,
            gateway,
        }
    }

    /// Route one notification. Structural failures (missing user or course,
    /// invalid scores, store errors) are returned to the caller.
    pub async fn dispatch(&self, notification: &Notification) -> NotificationResult<DispatchOutcome> {
        let Some(kind) = notification.notification_type.related_kind() else {
            info!(
                notification_type = %notification.notification_type,
                "No email handler for notification type"
            );
            return Ok(DispatchOutcome::Skipped(SkipReason::UnrecognizedType {
                notification_type: notification.notification_type.to_string(),
            }));
        };

        let user = self.resolver.fetch_user(&notification.user_id).await?;
        let Some(recipient) = user.recipient().map(str::to_string) else {
            warn!(user_id = %notification.user_id, "User has no email");
            return Ok(DispatchOutcome::Skipped(SkipReason::NoRecipient {
                user_id: notification.user_id.clone(),
            }));
        };

        info!(
            notification_type = %notification.notification_type,
            "Processing notification"
        );

        let Some(rendered) = self.render(notification, &user).await? else {
            info!(
                kind = %kind,
                related_id = %notification.related_id,
                "Related entity no longer exists, skipping"
            );
            return Ok(DispatchOutcome::Skipped(SkipReason::RelatedEntityMissing {
                kind,
                related_id: notification.related_id.clone(),
            }));
        };

        let report = self
            .gateway
            .send(&recipient, &rendered.subject, &rendered.html, &rendered.text)
            .await;

        Ok(DispatchOutcome::Delivered {
            recipient,
            subject: rendered.subject,
            report,
        })
    }

    /// Resolve the related entity and render. `Ok(None)` when it is absent.
    async fn render(&self, notification: &Notification, user: &User) -> NotificationResult<Option<RenderedEmail>> {
        let related_id = notification.related_id.as_str();
        let submitted_at = format_timestamp(notification.created_at.unwrap_or_else(Utc::now));

        match &notification.notification_type {
            NotificationType::Announcement => {
                let Some(announcement) = self.resolver.fetch_announcement(related_id).await? else {
                    return Ok(None);
                };
                let course = self.resolver.fetch_course(&announcement.course_id).await?;
                let instructor = self.resolver.fetch_user(&announcement.created_by).await?;

                let data = AnnouncementEmailData {
                    student_name: user.name().to_string(),
                    announcement_title: announcement.title,
                    announcement_content: announcement.content,
                    course_name: course.name,
                    instructor_name: instructor.name().to_string(),
                };
                self.templates.render_announcement(&data).map(Some)
            }
            NotificationType::AssignmentSubmitted => {
                let Some(assignment) = self.resolver.fetch_assignment(related_id).await? else {
                    return Ok(None);
                };
                let course = self.resolver.fetch_course(&assignment.course_id).await?;

                let data = AssignmentSubmittedData {
                    student_name: user.name().to_string(),
                    assignment_title: assignment.title,
                    course_name: course.name,
                    attempt_number: notification
                        .attempt_number
                        .filter(|attempt| *attempt > 0)
                        .unwrap_or_else(|| mining::extract_attempt_number(&notification.message)),
                    submitted_at,
                };
                self.templates.render_assignment_submitted(&data).map(Some)
            }
            NotificationType::AssignmentGraded => {
                let Some(assignment) = self.resolver.fetch_assignment(related_id).await? else {
                    return Ok(None);
                };
                let course = self.resolver.fetch_course(&assignment.course_id).await?;
                let ScorePair { score, total } = score_for(notification, mining::extract_assignment_score);

                let data = AssignmentGradedData {
                    student_name: user.name().to_string(),
                    assignment_title: assignment.title,
                    course_name: course.name,
                    score,
                    total_points: total,
                    feedback: notification.feedback.clone(),
                };
                self.templates.render_assignment_graded(&data).map(Some)
            }
            NotificationType::QuizSubmitted | NotificationType::QuizGraded => {
                let Some(quiz) = self.resolver.fetch_quiz(related_id).await? else {
                    return Ok(None);
                };
                let course = self.resolver.fetch_course(&quiz.course_id).await?;
                let ScorePair { score, total } = score_for(notification, mining::extract_quiz_score);

                let data = QuizResultData {
                    student_name: user.name().to_string(),
                    quiz_title: quiz.title,
                    course_name: course.name,
                    score,
                    total_questions: total,
                    submitted_at,
                };
                self.templates.render_quiz_result(&data).map(Some)
            }
            // Filtered out by `dispatch` before any store read.
            NotificationType::Unrecognized(_) => Ok(None),
        }
    }
}

/// Structured score when the record carries one, mined text otherwise.
fn score_for(notification: &Notification, mine: fn(&str) -> ScorePair) -> ScorePair {
    match notification.structured_score() {
        Some((score, total)) => ScorePair { score, total },
        None => mine(&notification.message),
    }
}
