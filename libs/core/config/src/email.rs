use crate::{env_optional, env_or_default, ConfigError, FromEnv};

/// Sender used when `EMAIL_FROM` is not set.
pub const DEFAULT_FROM_EMAIL: &str = "noreply@educateclassroom.com";
pub const DEFAULT_FROM_NAME: &str = "Educate Classroom";
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

/// Email delivery settings, read once at process start.
///
/// A missing API key is not an error: it puts delivery into dry-run mode,
/// where messages are logged instead of sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailDeliveryConfig {
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub api_url: String,
}

impl EmailDeliveryConfig {
    /// Dry-run configuration with the default sender.
    pub fn dry_run() -> Self {
        Self {
            api_key: None,
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            api_url: DEFAULT_SENDGRID_API_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_from_email(mut self, from_email: impl Into<String>) -> Self {
        self.from_email = from_email.into();
        self
    }

    /// Whether live delivery is enabled.
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for EmailDeliveryConfig {
    fn default() -> Self {
        Self::dry_run()
    }
}

impl FromEnv for EmailDeliveryConfig {
    /// Reads:
    /// - SENDGRID_API_KEY: optional, enables live delivery
    /// - EMAIL_FROM: defaults to noreply@educateclassroom.com
    /// - EMAIL_FROM_NAME: defaults to "Educate Classroom"
    /// - SENDGRID_API_URL: defaults to the public v3 endpoint
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_optional("SENDGRID_API_KEY"),
            from_email: env_optional("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            from_name: env_or_default("EMAIL_FROM_NAME", DEFAULT_FROM_NAME),
            api_url: env_or_default("SENDGRID_API_URL", DEFAULT_SENDGRID_API_URL),
        })
    }
}
