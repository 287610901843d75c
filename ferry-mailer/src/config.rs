//! Mail provider settings.

use std::{fmt, time::Duration};

use ferry_common::{ConfigError, Properties};
use serde::Deserialize;

fn default_region() -> String {
    "us-east-1".to_string()
}

const fn default_port() -> u16 {
    587
}

const fn default_timeout_secs() -> u64 {
    30
}

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportSecurity {
    /// Plain connection upgraded with `STARTTLS` (port 587).
    #[default]
    Starttls,
    /// TLS from the first byte (port 465).
    Tls,
}

/// Settings for the SES SMTP interface, read from the `ses=` file.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesConfig {
    /// Overrides the regional endpoint.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SMTP credentials issued for SES.
    pub username: String,
    pub password: String,

    #[serde(default)]
    pub transport: TransportSecurity,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SesConfig {
    /// Build from an already loaded properties file.
    ///
    /// # Errors
    ///
    /// Fails if the credentials are absent or a value cannot be parsed.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        properties.deserialize()
    }

    /// The configured host, or the SES SMTP endpoint for `region`.
    pub fn host(&self) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| format!("email-smtp.{}.amazonaws.com", self.region))
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for SesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SesConfig")
            .field("host", &self.host())
            .field("region", &self.region)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("transport", &self.transport)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
