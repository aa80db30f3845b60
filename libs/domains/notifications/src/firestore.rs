//! Firestore REST document store.
//!
//! Point reads go to `GET {documents}/{collection}/{id}`. Firestore wraps
//! every field in a typed envelope (`{"stringValue": "..."}`); those are
//! unwrapped into plain JSON before decoding into the domain models.

use async_trait::async_trait;
use core_config::firestore::FirestoreConfig;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{Announcement, Assignment, Course, Quiz, User};
use crate::store::{DocumentStore, collections};

pub struct FirestoreStore {
    config: FirestoreConfig,
    client: Client,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Document URL with the collection and id percent-encoded as single
    /// path segments, so ids containing `?`, `#` or spaces stay intact.
    fn document_url(&self, collection: &str, id: &str) -> NotificationResult<Url> {
        let mut url = Url::parse(&self.config.documents_url())
            .map_err(|e| NotificationError::Store(format!("invalid Firestore base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| NotificationError::Store("Firestore base URL cannot hold a path".to_string()))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    /// Token from the refreshed token file when configured, otherwise the
    /// static token.
    async fn bearer_token(&self) -> NotificationResult<Option<String>> {
        if let Some(path) = &self.config.access_token_file {
            let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                NotificationError::Store(format!("read access token {}: {e}", path.display()))
            })?;
            let token = raw.trim();
            if !token.is_empty() {
                return Ok(Some(token.to_string()));
            }
        }
        Ok(self.config.access_token.clone())
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> NotificationResult<Option<T>> {
        // An empty id would address the whole collection.
        if id.is_empty() || id.contains('/') {
            return Ok(None);
        }

        let url = self.document_url(collection, id)?;
        debug!(collection, id, "Fetching document from Firestore");

        let mut request = self.client.get(url);
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Store(format!("GET {collection}/{id}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Store(format!(
                "GET {collection}/{id} returned {status}: {body}"
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| NotificationError::Store(format!("GET {collection}/{id}: {e}")))?;

        let fields = decode_document(&document);
        serde_json::from_value(fields)
            .map(Some)
            .map_err(|e| NotificationError::Serialization(format!("{collection}/{id}: {e}")))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
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

/// Unwrap a Firestore document (`{"name": ..., "fields": {...}}`) into a plain
/// JSON object.
pub fn decode_document(document: &Value) -> Value {
    match document.get("fields") {
        Some(Value::Object(fields)) => decode_fields(fields),
        _ => Value::Object(Map::new()),
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect(),
    )
}

/// Unwrap a single typed Firestore value.
pub fn decode_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        // int64 values travel as strings
        "integerValue" => inner
            .as_str()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" | "booleanValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => inner.clone(),
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields),
            _ => Value::Object(Map::new()),
        },
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_document_scalars() {
        let document = json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {
                "email": {"stringValue": "a@x.com"},
                "displayName": {"stringValue": "Ada"},
                "age": {"integerValue": "21"},
                "gpa": {"doubleValue": 3.9},
                "active": {"booleanValue": true},
                "deletedAt": {"nullValue": null},
                "createdAt": {"timestampValue": "2025-03-01T14:30:00Z"}
            }
        });

        let decoded = decode_document(&document);
        assert_eq!(
            decoded,
            json!({
                "email": "a@x.com",
                "displayName": "Ada",
                "age": 21,
                "gpa": 3.9,
                "active": true,
                "deletedAt": null,
                "createdAt": "2025-03-01T14:30:00Z"
            })
        );

        let user: User = serde_json::from_value(decoded).unwrap();
        assert_eq!(user.recipient(), Some("a@x.com"));
    }

    #[test]
    fn test_decode_nested_map_and_array() {
        let value = json!({
            "mapValue": {
                "fields": {
                    "tags": {"arrayValue": {"values": [
                        {"stringValue": "math"},
                        {"integerValue": "7"}
                    ]}}
                }
            }
        });

        assert_eq!(decode_value(&value), json!({"tags": ["math", 7]}));
        assert_eq!(decode_value(&json!({"arrayValue": {}})), json!([]));
    }

    #[test]
    fn test_decode_document_without_fields() {
        assert_eq!(decode_document(&json!({"name": "x"})), json!({}));
    }

    #[test]
    fn test_document_url() {
        let store = FirestoreStore::new(FirestoreConfig::new("classroom"));
        assert_eq!(
            store.document_url(collections::QUIZZES, "q1").unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/classroom/databases/(default)/documents/quizzes/q1"
        );
    }

    #[test]
    fn test_document_url_encodes_reserved_characters() {
        let store = FirestoreStore::new(FirestoreConfig::new("classroom"));
        let url = store.document_url(collections::QUIZZES, "a?b#c d").unwrap();

        assert!(url.path().ends_with("/documents/quizzes/a%3Fb%23c%20d"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().unwrap().last(), Some("a%3Fb%23c%20d"));
    }

    #[test]
    fn test_document_url_rejects_invalid_base() {
        let mut config = FirestoreConfig::new("classroom");
        config.base_url = "not a url".to_string();

        let err = FirestoreStore::new(config)
            .document_url(collections::USERS, "u1")
            .unwrap_err();
        assert!(matches!(err, NotificationError::Store(_)));
    }

    #[tokio::test]
    async fn test_token_file_is_reread_per_request() {
        let path = std::env::temp_dir().join(format!("firestore-token-{}", std::process::id()));
        let mut config = FirestoreConfig::new("classroom");
        config.access_token = Some("static".to_string());
        let store = FirestoreStore::new(config.with_access_token_file(&path));

        tokio::fs::write(&path, "first\n").await.unwrap();
        assert_eq!(store.bearer_token().await.unwrap().as_deref(), Some("first"));

        tokio::fs::write(&path, "second").await.unwrap();
        assert_eq!(store.bearer_token().await.unwrap().as_deref(), Some("second"));

        tokio::fs::write(&path, "  ").await.unwrap();
        assert_eq!(store.bearer_token().await.unwrap().as_deref(), Some("static"));

        tokio::fs::remove_file(&path).await.unwrap();
        assert!(matches!(
            store.bearer_token().await,
            Err(NotificationError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_id_is_absent_without_network() {
        let store = FirestoreStore::new(FirestoreConfig::new("classroom"));
        assert!(store.get_assignment("").await.unwrap().is_none());
        assert!(store.get_assignment("a/b").await.unwrap().is_none());
    }
}
