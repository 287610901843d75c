use thiserror::Error;

/// Errors raised by a [`Mailer`](crate::Mailer).
#[derive(Debug, Error)]
pub enum MailerError {
    /// The provider host could not be turned into a transport.
    #[error("Invalid mail provider host {host}: {reason}")]
    InvalidHost { host: String, reason: String },

    /// The provider did not answer the connection check.
    #[error("Unable to reach mail provider {host}: {reason}")]
    Unreachable { host: String, reason: String },

    /// A sender or recipient is not a valid mailbox.
    #[error("Invalid {field} address {address:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        reason: String,
    },

    /// The message could not be assembled.
    #[error("Unable to build message: {0}")]
    Build(String),

    /// The provider rejected the message or the transfer failed.
    #[error("Unable to send message: {0}")]
    Send(String),
}

impl MailerError {
    /// Returns `true` for errors caused by the message itself rather than the
    /// provider.
    #[must_use]
    pub const fn is_message_error(&self) -> bool {
        matches!(self, Self::InvalidAddress { .. } | Self::Build(_))
    }
}

/// Specialized `Result` type for mailer operations.
pub type Result<T> = std::result::Result<T, MailerError>;
