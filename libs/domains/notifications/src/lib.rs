//! Notifications Domain
//!
//! Turns newly created classroom notifications (announcements, assignment
//! submissions and grades, quiz results) into emails for the affected student.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ NotificationTrigger │  ← one invocation per created notification, absorbs failures
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │ NotificationDispatch│  ← routes on `type`, skips unknown types
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   EntityResolver    │  ← user, related entity, course (DocumentStore)
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   TemplateEngine    │  ← subject + HTML + text (Handlebars)
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   DeliveryGateway   │  ← SendGrid, or dry-run logging without a key
//! └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     DeliveryGateway, InMemoryDocumentStore, NotificationDispatcher,
//!     NotificationTrigger, TemplateEngine,
//! };
//!
//! let gateway = DeliveryGateway::from_config(EmailDeliveryConfig::from_env()?);
//! let dispatcher = NotificationDispatcher::new(store, Arc::new(TemplateEngine::new()?), Arc::new(gateway));
//! let trigger = NotificationTrigger::new(dispatcher);
//!
//! let outcome = trigger.on_notification_created(&notification).await;
//! ```

pub mod dispatch;
pub mod error;
pub mod firestore;
pub mod gateway;
pub mod mining;
pub mod models;
pub mod providers;
pub mod resolver;
pub mod store;
pub mod templates;
pub mod trigger;

// Re-export commonly used types
pub use dispatch::{DispatchOutcome, NotificationDispatcher, SkipReason};
pub use error::{NotificationError, NotificationResult};
pub use firestore::FirestoreStore;
pub use gateway::{DeliveryGateway, DeliveryReport};
pub use models::{
    Announcement, Assignment, Course, Notification, NotificationType, Quiz, RelatedKind, User,
};
pub use providers::{EmailContent, EmailProvider, MockEmailProvider, SendGridProvider};
pub use resolver::EntityResolver;
pub use store::{DocumentStore, InMemoryDocumentStore};
pub use templates::{RenderedEmail, TemplateEngine};
pub use trigger::{InvocationOutcome, NotificationTrigger};
