//! Broker connection settings.

use std::{fmt, path::PathBuf};

use ferry_common::{ConfigError, Properties};
use serde::{
    Deserialize, Deserializer,
    de::{self, Unexpected},
};

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    5672
}

fn default_credential() -> String {
    "guest".to_string()
}

fn default_vhost() -> String {
    "/".to_string()
}

/// `SSL` is on only for exactly `1` and off only for exactly `0`.
fn ssl_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;

    match value.as_str() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(de::Error::invalid_value(Unexpected::Str(other), &"0 or 1")),
    }
}

/// Settings for the broker connection, read from the `rmq=` file.
///
/// Immutable once loaded. Key names follow the file's camelCase convention
/// (`queueName`, `clientKeyCert`, ...), with the transport-security flag
/// spelled `SSL`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_credential")]
    pub username: String,

    #[serde(default = "default_credential")]
    pub password: String,

    /// Virtual-host namespace on the broker.
    #[serde(default = "default_vhost")]
    pub vhost: String,

    /// Queue consumed with explicit acknowledgement. Required.
    pub queue_name: String,

    /// Consumer tag announced to the broker; empty lets the broker pick one.
    #[serde(default)]
    pub consumer_tag: String,

    /// Whether to use mutually-authenticated TLS (`SSL=1`).
    #[serde(rename = "SSL", default, deserialize_with = "ssl_flag")]
    pub ssl: bool,

    /// PKCS#12 file holding the client key and certificate chain.
    #[serde(default)]
    pub client_key_cert: Option<PathBuf>,

    #[serde(default)]
    pub client_key_passphrase: Option<String>,

    /// Trust store holding the certificates used to verify the broker.
    #[serde(default)]
    pub trust_keystore: Option<PathBuf>,

    #[serde(default)]
    pub trust_keystore_passphrase: Option<String>,
}

impl BrokerConfig {
    /// Build from an already loaded properties file.
    ///
    /// # Errors
    ///
    /// Fails if `queueName` is absent or a value cannot be parsed.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        properties.deserialize()
    }

    /// `host:port` for log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vhost", &self.vhost)
            .field("queue_name", &self.queue_name)
            .field("consumer_tag", &self.consumer_tag)
            .field("ssl", &self.ssl)
            .field("client_key_cert", &self.client_key_cert)
            .field(
                "client_key_passphrase",
                &self.client_key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("trust_keystore", &self.trust_keystore)
            .field(
                "trust_keystore_passphrase",
                &self.trust_keystore_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
