use crate::{env_optional, env_or_default, env_parse_or, ConfigError, FromEnv};
use std::net::Ipv4Addr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;

/// HTTP host configuration for the trigger service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    pub host: String,
    pub port: u16,
    /// JSON snapshot of the document collections. When set, the service
    /// reads from it instead of Firestore (local runs and demos).
    pub store_snapshot: Option<PathBuf>,
}

impl HostConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            store_snapshot: None,
        }
    }

    pub fn with_store_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_snapshot = Some(path.into());
        self
    }

    /// "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for HostConfig {
    /// - HOST: defaults to 0.0.0.0
    /// - PORT: defaults to 8080
    /// - STORE_SNAPSHOT_PATH: optional
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string()),
            port: env_parse_or("PORT", DEFAULT_PORT)?,
            store_snapshot: env_optional("STORE_SNAPSHOT_PATH").map(PathBuf::from),
        })
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED.to_string(), DEFAULT_PORT)
    }
}
