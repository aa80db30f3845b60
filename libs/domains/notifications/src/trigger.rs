//! Trigger adapter: the entry point the hosting event system calls once per
//! newly created notification record.
//!
//! This is the only failure boundary. Whatever goes wrong below it is logged
//! and absorbed into `InvocationOutcome::FailureAbsorbed`, so the host always
//! sees a clean completion and decides about retries on its own.

use serde::Serialize;
use tracing::{Instrument, error, info, info_span};

use crate::dispatch::{DispatchOutcome, NotificationDispatcher};
use crate::models::Notification;
use crate::store::DocumentStore;

/// Result of one trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Completed { outcome: DispatchOutcome },
    FailureAbsorbed { error: String },
}

impl InvocationOutcome {
    pub fn is_failure_absorbed(&self) -> bool {
        matches!(self, InvocationOutcome::FailureAbsorbed { .. })
    }

    pub fn dispatch_outcome(&self) -> Option<&DispatchOutcome> {
        match self {
            InvocationOutcome::Completed { outcome } => Some(outcome),
            InvocationOutcome::FailureAbsorbed { .. } => None,
        }
    }
}

pub struct NotificationTrigger<S> {
    dispatcher: NotificationDispatcher<S>,
}

impl<S: DocumentStore> NotificationTrigger<S> {
    pub fn new(dispatcher: NotificationDispatcher<S>) -> Self {
        Self { dispatcher }
    }

    /// Handle one newly created notification.
    pub async fn on_notification_created(&self, notification: &Notification) -> InvocationOutcome {
        let span = info_span!(
            "notification_created",
            notification_id = notification.id.as_deref().unwrap_or("-"),
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            related_id = %notification.related_id,
        );

        async {
            match self.dispatcher.dispatch(notification).await {
                Ok(outcome) => {
                    info!(outcome = outcome.kind(), "Notification handled");
                    InvocationOutcome::Completed { outcome }
                }
                Err(e) => {
                    error!(error = %e, "Error in notification trigger");
                    InvocationOutcome::FailureAbsorbed { error: e.to_string() }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Decode a raw JSON event body and handle it. Malformed payloads are
    /// absorbed like any other failure.
    pub async fn handle_payload(&self, payload: &[u8]) -> InvocationOutcome {
        match serde_json::from_slice::<Notification>(payload) {
            Ok(notification) => self.on_notification_created(&notification).await,
            Err(e) => {
                error!(error = %e, payload_bytes = payload.len(), "Malformed notification payload");
                InvocationOutcome::FailureAbsorbed {
                    error: format!("malformed notification payload: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::gateway::DeliveryGateway;
    use crate::providers::MockEmailProvider;
    use crate::store::MockDocumentStore;
    use crate::templates::TemplateEngine;
    use core_config::email::EmailDeliveryConfig;
    use std::sync::Arc;

    fn trigger(store: MockDocumentStore) -> NotificationTrigger<MockDocumentStore> {
        let gateway = DeliveryGateway::with_provider(
            EmailDeliveryConfig::dry_run().with_api_key("SG.test"),
            Arc::new(MockEmailProvider::new()),
        );
        NotificationTrigger::new(NotificationDispatcher::new(
            store,
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(gateway),
        ))
    }

    #[tokio::test]
    async fn test_missing_user_is_absorbed() {
        let mut store = MockDocumentStore::new();
        store.expect_get_user().returning(|_| Ok(None));

        let outcome = trigger(store)
            .on_notification_created(&Notification::new("ghost", "quizGraded", "q1", ""))
            .await;

        assert_eq!(
            outcome,
            InvocationOutcome::FailureAbsorbed {
                error: "User not found: ghost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_absorbed() {
        let mut store = MockDocumentStore::new();
        store
            .expect_get_user()
            .returning(|_| Err(NotificationError::Store("connection reset".to_string())));

        let outcome = trigger(store)
            .on_notification_created(&Notification::new("u1", "announcement", "n1", ""))
            .await;

        assert!(outcome.is_failure_absorbed());
        assert!(outcome.dispatch_outcome().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_absorbed() {
        let outcome = trigger(MockDocumentStore::new())
            .handle_payload(br#"{"type": "quizGraded"}"#)
            .await;

        match outcome {
            InvocationOutcome::FailureAbsorbed { error } => {
                assert!(error.starts_with("malformed notification payload"));
                assert!(error.contains("userId"));
            }
            other => panic!("expected absorbed failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_payload_with_unknown_type_completes() {
        let outcome = trigger(MockDocumentStore::new())
            .handle_payload(br#"{"userId": "u1", "type": "streakReminder", "relatedId": "", "message": ""}"#)
            .await;

        assert!(!outcome.is_failure_absorbed());
        assert!(matches!(
            outcome.dispatch_outcome(),
            Some(DispatchOutcome::Skipped(_))
        ));
    }
}
