//! Tunable behaviour of the delivery loop, read from the broker file.

use std::time::Duration;

use ferry_common::{ConfigError, Properties};
use serde::Deserialize;

const fn default_ack_on_forward_failure() -> bool {
    true
}

/// What the loop does with deliveries it could not forward, and how it
/// reacts to the broker going away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPolicy {
    /// Acknowledge a delivery whose email could not be sent.
    ///
    /// `true` drops unsendable requests instead of having the broker redeliver
    /// them; `false` leaves them unacknowledged.
    #[serde(default = "default_ack_on_forward_failure")]
    pub ack_on_forward_failure: bool,

    /// Consecutive broker shutdown signals tolerated while waiting. `None`
    /// waits again forever.
    #[serde(default)]
    pub shutdown_retry_limit: Option<u32>,

    /// Pause before waiting again after a shutdown signal.
    #[serde(default)]
    pub shutdown_retry_backoff_ms: u64,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            ack_on_forward_failure: default_ack_on_forward_failure(),
            shutdown_retry_limit: None,
            shutdown_retry_backoff_ms: 0,
        }
    }
}

impl RelayPolicy {
    /// Build from the broker properties file.
    ///
    /// # Errors
    ///
    /// Fails if one of the policy values cannot be parsed.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        properties.deserialize()
    }

    pub const fn shutdown_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.shutdown_retry_backoff_ms)
    }

    /// Whether another wait is allowed after `retries` consecutive shutdown
    /// signals have already been retried.
    pub fn may_retry_shutdown(&self, retries: u32) -> bool {
        self.shutdown_retry_limit.is_none_or(|limit| retries < limit)
    }
}
