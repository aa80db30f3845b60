//! Classroom Notification Trigger Service
//!
//! Hosts the notification trigger behind HTTP so the document store's
//! "notification created" event can be delivered to it.
//!
//! ## Architecture
//!
//! ```text
//! Document store event (notifications/{id} created)
//!   ↓ POST /events/notification-created
//! NotificationTrigger (absorbs every failure, always 200)
//!   ↓
//! NotificationDispatcher → EntityResolver → TemplateEngine
//!   ↓
//! DeliveryGateway (SendGrid, or dry-run logging)
//! ```
//!
//! ## Endpoints
//!
//! - `POST /events/notification-created`: raw notification JSON, answers with the invocation outcome
//! - `GET /health`: liveness probe

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use core_config::email::EmailDeliveryConfig;
use core_config::firestore::FirestoreConfig;
use core_config::server::HostConfig;
use core_config::{Environment, FromEnv};
use domain_notifications::{
    DeliveryGateway, DocumentStore, FirestoreStore, InMemoryDocumentStore, InvocationOutcome,
    NotificationDispatcher, NotificationTrigger, TemplateEngine,
};
use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

/// Build the HTTP router around a trigger.
pub fn router<S: DocumentStore + 'static>(trigger: Arc<NotificationTrigger<S>>) -> Router {
    Router::new()
        .route("/events/notification-created", post(notification_created::<S>))
        .route("/health", get(health))
        .with_state(trigger)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The host only sees a completed invocation; the outcome body is informational.
async fn notification_created<S: DocumentStore + 'static>(
    State(trigger): State<Arc<NotificationTrigger<S>>>,
    body: Bytes,
) -> Json<InvocationOutcome> {
    Json(trigger.handle_payload(&body).await)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run the trigger service
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads delivery configuration (dry-run when no SendGrid key is set)
/// 3. Picks the document store (snapshot file or Firestore)
/// 4. Serves until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error if configuration is invalid, the snapshot cannot be
/// loaded, the templates fail to register, or the listener cannot bind.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting notification trigger service"
    );
    info!("Environment: {:?}", environment);

    let host = HostConfig::from_env().wrap_err("Failed to load host configuration")?;
    let email = EmailDeliveryConfig::from_env().wrap_err("Failed to load email configuration")?;

    let gateway = DeliveryGateway::from_config(email);
    if gateway.is_dry_run() {
        warn!("SENDGRID_API_KEY not set, emails will be logged instead of sent");
    } else {
        info!(from = %gateway.config().from_email, "Using SendGrid provider");
    }

    let templates = TemplateEngine::new().wrap_err("Failed to initialize template engine")?;
    info!("Template engine initialized");

    let templates = Arc::new(templates);
    let gateway = Arc::new(gateway);

    match &host.store_snapshot {
        Some(path) => {
            let store = load_snapshot(path)?;
            info!(path = %path.display(), "Using in-memory snapshot store");
            let trigger = NotificationTrigger::new(NotificationDispatcher::new(store, templates, gateway));
            serve(router(Arc::new(trigger)), &host).await?;
        }
        None => {
            let firestore = FirestoreConfig::from_env().wrap_err("Failed to load Firestore configuration")?;
            info!(
                project_id = %firestore.project_id,
                database = %firestore.database,
                token_file = ?firestore.access_token_file,
                "Using Firestore document store"
            );
            if firestore.access_token_file.is_none() && firestore.access_token.is_some() {
                warn!("Static FIRESTORE_ACCESS_TOKEN expires after about an hour; prefer FIRESTORE_ACCESS_TOKEN_FILE");
            }
            let store = FirestoreStore::new(firestore);
            let trigger = NotificationTrigger::new(NotificationDispatcher::new(store, templates, gateway));
            serve(router(Arc::new(trigger)), &host).await?;
        }
    }

    info!("Notification trigger service stopped");
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<InMemoryDocumentStore> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read store snapshot {}", path.display()))?;
    let snapshot: Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Store snapshot {} is not valid JSON", path.display()))?;
    InMemoryDocumentStore::from_snapshot(snapshot).wrap_err("Store snapshot has an unexpected shape")
}

async fn serve(app: Router, host: &HostConfig) -> Result<()> {
    let addr = host.address();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind server to {}", addr))?;

    info!(address = %addr, "Notification trigger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server failed")?;

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use domain_notifications::MockEmailProvider;
    use domain_notifications::store::collections;
    use tower::ServiceExt;

    async fn app(provider: MockEmailProvider) -> Router {
        let store = InMemoryDocumentStore::new();
        store
            .insert(collections::USERS, "u1", json!({"email": "a@x.com", "displayName": "Ada"}))
            .await;
        store
            .insert(collections::COURSES, "c1", json!({"name": "Math 101"}))
            .await;
        store
            .insert(collections::QUIZZES, "q1", json!({"title": "Algebra Quiz", "courseId": "c1"}))
            .await;

        let gateway = DeliveryGateway::with_provider(
            EmailDeliveryConfig::dry_run().with_api_key("SG.test"),
            Arc::new(provider),
        );
        let trigger = NotificationTrigger::new(NotificationDispatcher::new(
            store,
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(gateway),
        ));
        router(Arc::new(trigger))
    }

    async fn post_event(app: Router, body: &'static str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/events/notification-created")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_event_delivers_email() {
        let provider = MockEmailProvider::new();
        let (status, body) = post_event(
            app(provider.clone()).await,
            r#"{"userId": "u1", "type": "quizSubmitted", "relatedId": "q1", "message": "Score: 8/10"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["outcome"]["outcome"], "delivered");
        assert_eq!(body["outcome"]["recipient"], "a@x.com");
        assert!(provider.was_sent_to("a@x.com").await);
    }

    #[tokio::test]
    async fn test_failures_still_answer_ok() {
        let provider = MockEmailProvider::new();
        let (status, body) = post_event(
            app(provider.clone()).await,
            r#"{"userId": "ghost", "type": "quizSubmitted", "relatedId": "q1", "message": ""}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failure_absorbed");
        assert_eq!(body["error"], "User not found: ghost");
        assert_eq!(provider.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_body_answers_ok() {
        let (status, body) = post_event(app(MockEmailProvider::new()).await, "not json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failure_absorbed");
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockEmailProvider::new())
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_bundled_fixture_serves_every_type() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/classroom.json");
        let store = load_snapshot(&fixture).unwrap();
        let provider = MockEmailProvider::new();
        let gateway = DeliveryGateway::with_provider(
            EmailDeliveryConfig::dry_run().with_api_key("SG.test"),
            Arc::new(provider.clone()),
        );
        let trigger = NotificationTrigger::new(NotificationDispatcher::new(
            store,
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(gateway),
        ));

        for (notification_type, related_id) in [
            ("announcement", "n1"),
            ("assignmentSubmitted", "as1"),
            ("assignmentGraded", "as1"),
            ("quizSubmitted", "q1"),
            ("quizGraded", "q1"),
        ] {
            let payload = json!({
                "userId": "u1",
                "type": notification_type,
                "relatedId": related_id,
                "message": "Attempt #2, Score: 8/10"
            });
            let outcome = trigger
                .handle_payload(&serde_json::to_vec(&payload).unwrap())
                .await;
            assert!(!outcome.is_failure_absorbed(), "{notification_type}: {outcome:?}");
        }

        assert_eq!(provider.sent_count().await, 5);
        assert!(provider.was_sent_to("a@x.com").await);
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let err = load_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read store snapshot"));
    }
}
