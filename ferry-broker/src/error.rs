//! Error types for the ferry-broker crate.
//!
//! [`TlsError`] covers loading key and trust material; [`BrokerError`] covers
//! the connection lifecycle and per-delivery operations.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::DeliveryTag;

/// Errors raised while building the broker TLS context.
///
/// All of them are startup-fatal and none leave a partially built context
/// behind.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A key required when `SSL=1` is absent from the configuration.
    #[error("With SSL enabled you must specify property {0}")]
    MissingSetting(&'static str),

    /// The key or trust material could not be read.
    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The keystore could not be decoded (corrupt, or wrong passphrase).
    #[error("Unable to load keystore {}: {reason}", path.display())]
    KeyStore { path: PathBuf, reason: String },

    /// The client keystore holds no private key with a certificate chain.
    #[error("Keystore {} does not contain a private key and certificate chain", path.display())]
    NoPrivateKey { path: PathBuf },

    /// The client identity is stored in a keystore type that cannot be read.
    #[error("Keystore {} uses the unsupported {format} format", path.display())]
    UnsupportedFormat { path: PathBuf, format: &'static str },

    /// The trust store does not hold a single usable certificate.
    #[error("Trust store {} contains no trusted certificates", path.display())]
    NoTrustAnchors { path: PathBuf },

    /// A certificate was rejected when building the trust anchors.
    #[error("Invalid certificate in {}: {reason}", path.display())]
    Certificate { path: PathBuf, reason: String },

    /// The broker host is not a valid TLS server name.
    #[error("Invalid TLS server name {0}")]
    ServerName(String),

    /// Rustls rejected the combined configuration.
    #[error("TLS error: {0}")]
    Rustls(String),
}

impl From<tokio_rustls::rustls::Error> for TlsError {
    fn from(err: tokio_rustls::rustls::Error) -> Self {
        Self::Rustls(err.to_string())
    }
}

/// Errors raised by a broker connection.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Building the TLS context failed.
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The connection could not be opened.
    #[error("Unable to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The channel could not be opened.
    #[error("Unable to open channel: {0}")]
    OpenChannel(String),

    /// Consumption of the queue could not be started.
    #[error("Unable to consume from queue {queue}: {reason}")]
    Consume { queue: String, reason: String },

    /// Receiving the next delivery failed.
    #[error("Unable to receive delivery: {0}")]
    Receive(String),

    /// Acknowledging a delivery failed.
    #[error("Unable to acknowledge delivery {tag}: {reason}")]
    Ack { tag: DeliveryTag, reason: String },

    /// Closing the channel failed.
    #[error("Unable to close channel: {0}")]
    CloseChannel(String),

    /// Closing the connection failed.
    #[error("Unable to close connection: {0}")]
    CloseConnection(String),
}

impl BrokerError {
    /// Returns `true` if this error was raised before any socket was opened.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Specialized `Result` type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
