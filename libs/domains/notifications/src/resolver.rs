//! Entity resolution on top of a `DocumentStore`.
//!
//! Users and courses are structural prerequisites: a missing record is an
//! error. The related announcement/assignment/quiz may have been deleted
//! after the notification was written, so its absence is `Ok(None)`.

use tracing::debug;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{Announcement, Assignment, Course, Quiz, User};
use crate::store::DocumentStore;

pub struct EntityResolver<S> {
    store: S,
}

impl<S: DocumentStore> EntityResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn fetch_user(&self, id: &str) -> NotificationResult<User> {
        if id.is_empty() {
            return Err(NotificationError::UserNotFound(id.to_string()));
        }

        let mut user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| NotificationError::UserNotFound(id.to_string()))?;
        user.uid = id.to_string();

        debug!(user_id = %id, has_email = user.recipient().is_some(), "Resolved user");
        Ok(user)
    }

    pub async fn fetch_course(&self, id: &str) -> NotificationResult<Course> {
        if id.is_empty() {
            return Err(NotificationError::CourseNotFound(id.to_string()));
        }

        self.store
            .get_course(id)
            .await?
            .ok_or_else(|| NotificationError::CourseNotFound(id.to_string()))
    }

    pub async fn fetch_announcement(&self, id: &str) -> NotificationResult<Option<Announcement>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.store.get_announcement(id).await
    }

    pub async fn fetch_assignment(&self, id: &str) -> NotificationResult<Option<Assignment>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.store.get_assignment(id).await
    }

    pub async fn fetch_quiz(&self, id: &str) -> NotificationResult<Option<Quiz>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.store.get_quiz(id).await
    }
}
