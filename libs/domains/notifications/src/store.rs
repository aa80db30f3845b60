//! Document store seam.
//!
//! The pipeline only performs point reads by id. `InMemoryDocumentStore`
//! backs tests and local runs; `FirestoreStore` (see `firestore`) talks to
//! the real document database.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{Announcement, Assignment, Course, Quiz, User};

/// Collection names shared by every store implementation.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COURSES: &str = "courses";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const ASSIGNMENTS: &str = "assignments";
    pub const QUIZZES: &str = "quizzes";
}

/// Read-only access to the documents a notification can reference.
///
/// `Ok(None)` means the document does not exist; `Err` is reserved for
/// transport and decoding failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_user(&self, id: &str) -> NotificationResult<Option<User>>;

    async fn get_course(&self, id: &str) -> NotificationResult<Option<Course>>;

    async fn get_announcement(&self, id: &str) -> NotificationResult<Option<Announcement>>;

    async fn get_assignment(&self, id: &str) -> NotificationResult<Option<Assignment>>;

    async fn get_quiz(&self, id: &str) -> NotificationResult<Option<Quiz>>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn get_user(&self, id: &str) -> NotificationResult<Option<User>> {
        (**self).get_user(id).await
    }

    async fn get_course(&self, id: &str) -> NotificationResult<Option<Course>> {
        (**self).get_course(id).await
    }

    async fn get_announcement(&self, id: &str) -> NotificationResult<Option<Announcement>> {
        (**self).get_announcement(id).await
    }

    async fn get_assignment(&self, id: &str) -> NotificationResult<Option<Assignment>> {
        (**self).get_assignment(id).await
    }

    async fn get_quiz(&self, id: &str) -> NotificationResult<Option<Quiz>> {
        (**self).get_quiz(id).await
    }
}

/// In-memory document store holding raw JSON documents per collection.
///
/// Documents are decoded on read, exactly like a remote store would, so a
/// malformed fixture surfaces as `NotificationError::Serialization`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
    reads: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot shaped like
    /// `{"users": {"u1": {...}}, "courses": {...}}`.
    pub fn from_snapshot(snapshot: Value) -> NotificationResult<Self> {
        let parsed: HashMap<String, HashMap<String, Value>> = serde_json::from_value(snapshot)?;
        Ok(Self {
            collections: Arc::new(RwLock::new(parsed)),
            reads: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Insert or replace a raw document.
    pub async fn insert(&self, collection: &str, id: &str, document: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Remove a document, returning whether it existed.
    pub async fn remove(&self, collection: &str, id: &str) -> bool {
        self.collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some()
    }

    /// Number of point reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> NotificationResult<Option<T>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let document = self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned();

        document
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    NotificationError::Serialization(format!("{collection}/{id}: {e}"))
                })
            })
            .transpose()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_user(&self, id: &str) -> NotificationResult<Option<User>> {
        self.get_document(collections::USERS, id).await
    }

    async fn get_course(&self, id: &str) -> NotificationResult<Option<Course>> {
        self.get_document(collections::COURSES, id).await
    }

    async fn get_announcement(&self, id: &str) -> NotificationResult<Option<Announcement>> {
        self.get_document(collections::ANNOUNCEMENTS, id).await
    }

    async fn get_assignment(&self, id: &str) -> NotificationResult<Option<Assignment>> {
        self.get_document(collections::ASSIGNMENTS, id).await
    }

    async fn get_quiz(&self, id: &str) -> NotificationResult<Option<Quiz>> {
        self.get_document(collections::QUIZZES, id).await
    }
}
