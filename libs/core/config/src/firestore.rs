//! Firestore REST connection settings.
//!
//! Google access tokens expire after about an hour, so a static
//! `FIRESTORE_ACCESS_TOKEN` only suits short runs and the emulator. Long-lived
//! deployments should point `FIRESTORE_ACCESS_TOKEN_FILE` at a file that a
//! sidecar or mounted secret keeps fresh; it is re-read for every request.

use crate::{env_optional, env_or_default, env_required, ConfigError, FromEnv};
use std::path::PathBuf;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore REST connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    /// REST base URL; point at the emulator (`http://localhost:8080/v1`) for local runs
    pub base_url: String,
    /// Static bearer token, unset when talking to the emulator
    pub access_token: Option<String>,
    /// File holding a bearer token that is refreshed externally; takes
    /// precedence over `access_token`
    pub access_token_file: Option<PathBuf>,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".to_string(),
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            access_token: None,
            access_token_file: None,
        }
    }

    pub fn with_access_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.access_token_file = Some(path.into());
        self
    }

    /// Documents root, e.g. `.../projects/p/databases/(default)/documents`
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

impl FromEnv for FirestoreConfig {
    /// Reads:
    /// - FIRESTORE_PROJECT_ID: required
    /// - FIRESTORE_DATABASE: defaults to "(default)"
    /// - FIRESTORE_BASE_URL: defaults to the public REST endpoint
    /// - FIRESTORE_ACCESS_TOKEN: optional
    /// - FIRESTORE_ACCESS_TOKEN_FILE: optional, re-read per request
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: env_required("FIRESTORE_PROJECT_ID")?,
            database: env_or_default("FIRESTORE_DATABASE", "(default)"),
            base_url: env_or_default("FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL),
            access_token: env_optional("FIRESTORE_ACCESS_TOKEN"),
            access_token_file: env_optional("FIRESTORE_ACCESS_TOKEN_FILE").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firestore_config_requires_project() {
        temp_env::with_var_unset("FIRESTORE_PROJECT_ID", || {
            let err = FirestoreConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("FIRESTORE_PROJECT_ID"));
        });
    }

    #[test]
    fn test_documents_url_for_emulator() {
        temp_env::with_vars(
            [
                ("FIRESTORE_PROJECT_ID", Some("classroom-dev")),
                ("FIRESTORE_DATABASE", None),
                ("FIRESTORE_BASE_URL", Some("http://localhost:8080/v1/")),
                ("FIRESTORE_ACCESS_TOKEN", None),
                ("FIRESTORE_ACCESS_TOKEN_FILE", None),
            ],
            || {
                let config = FirestoreConfig::from_env().unwrap();
                assert_eq!(config.access_token, None);
                assert_eq!(config.access_token_file, None);
                assert_eq!(
                    config.documents_url(),
                    "http://localhost:8080/v1/projects/classroom-dev/databases/(default)/documents"
                );
            },
        );
    }

    #[test]
    fn test_access_token_file_from_env() {
        temp_env::with_vars(
            [
                ("FIRESTORE_PROJECT_ID", Some("classroom")),
                ("FIRESTORE_ACCESS_TOKEN_FILE", Some("/var/run/secrets/firestore-token")),
            ],
            || {
                let config = FirestoreConfig::from_env().unwrap();
                assert_eq!(
                    config.access_token_file,
                    Some(PathBuf::from("/var/run/secrets/firestore-token"))
                );
            },
        );
    }
}
