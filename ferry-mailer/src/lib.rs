//! The mail provider side of the relay.
//!
//! [`Mailer`] is the seam the delivery loop forwards through; [`SesMailer`]
//! implements it against the Amazon SES SMTP interface.

mod config;
mod error;
mod ses;

use async_trait::async_trait;

pub use config::{SesConfig, TransportSecurity};
pub use error::{MailerError, Result};
pub use ses::SesMailer;

/// An outgoing mail client.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one plain-text message.
    ///
    /// # Errors
    ///
    /// Any failure to build or hand over the message. The caller decides
    /// whether the failure is recoverable.
    async fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Release the client.
    ///
    /// # Errors
    ///
    /// Fails if the provider connection could not be shut down cleanly.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
