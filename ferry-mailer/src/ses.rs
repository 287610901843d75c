//! Amazon SES over its SMTP interface.

use async_trait::async_trait;
use ferry_common::{internal, outbound, tracing};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{
    Mailer, SesConfig, TransportSecurity,
    error::{MailerError, Result},
};

/// A [`Mailer`] sending through the SES SMTP endpoint.
pub struct SesMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SesMailer {
    /// Build the transport without touching the network.
    ///
    /// # Errors
    ///
    /// Fails if the host cannot be used for a TLS session.
    pub fn new(config: &SesConfig) -> Result<Self> {
        let host = config.host();

        let builder = match config.transport {
            TransportSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            }
            TransportSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&host),
        }
        .map_err(|e| MailerError::InvalidHost {
            host: host.clone(),
            reason: e.to_string(),
        })?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self { transport, host })
    }

    /// Build the transport and check that the provider answers.
    ///
    /// # Errors
    ///
    /// Fails if the host is invalid or the provider cannot be reached.
    pub async fn connect(config: &SesConfig) -> Result<Self> {
        let mailer = Self::new(config)?;

        tracing::debug!(
            "Checking mail provider {}:{} ({:?})",
            mailer.host,
            config.port,
            config.transport
        );

        match mailer.transport.test_connection().await {
            Ok(true) => {
                internal!(level = INFO, "Connected to mail provider {}", mailer.host);
                Ok(mailer)
            }
            Ok(false) => Err(MailerError::Unreachable {
                host: mailer.host,
                reason: "connection check was refused".to_string(),
            }),
            Err(e) => Err(MailerError::Unreachable {
                host: mailer.host,
                reason: e.to_string(),
            }),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn mailbox(field: &'static str, address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| MailerError::InvalidAddress {
            field,
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Assemble a plain-text message with a single sender and recipient.
pub(crate) fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
    Message::builder()
        .from(mailbox("from", from)?)
        .to(mailbox("to", to)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| MailerError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = build_message(from, to, subject, body)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailerError::Send(e.to_string()))?;

        outbound!(
            level = DEBUG,
            "Sent to {to} via {}: {} {}",
            self.host,
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );

        Ok(())
    }

    async fn close(self) -> Result<()> {
        drop(self.transport);
        internal!("Mail provider transport for {} released", self.host);
        Ok(())
    }
}
