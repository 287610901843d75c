use std::sync::LazyLock;

use anyhow::Context as _;
use ferry_broker::{AmqpBroker, BrokerConfig, TlsContext};
use ferry_common::{Properties, Signal, internal, tracing};
use ferry_mailer::{Mailer, SesConfig, SesMailer};
use ferry_relay::{Relay, RelayPolicy, Termination};
use tokio::sync::broadcast;

use crate::cli::Parameters;

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(16);
    sender
});

/// Everything read from the two configuration files.
#[derive(Debug)]
pub struct Settings {
    pub broker: BrokerConfig,
    pub policy: RelayPolicy,
    pub ses: SesConfig,
}

impl Settings {
    /// Read and validate both files without touching the network.
    ///
    /// # Errors
    ///
    /// Fails if either file cannot be read, or a required key is missing or
    /// malformed.
    pub fn load(parameters: &Parameters) -> anyhow::Result<Self> {
        let ses = Properties::load(&parameters.ses)
            .context("Unable to read parameters for AWS SES")?;
        let rmq = Properties::load(&parameters.rmq)
            .context("Unable to read parameters for RabbitMQ")?;

        let broker = BrokerConfig::from_properties(&rmq)?;
        let policy = RelayPolicy::from_properties(&rmq)?;
        let ses = SesConfig::from_properties(&ses).with_context(|| {
            format!(
                "{} does not provide the information required to connect to AWS SES",
                parameters.ses.display()
            )
        })?;

        Ok(Self { broker, policy, ses })
    }
}

pub struct Ferry {
    relay: Relay<AmqpBroker, SesMailer>,
}

impl Ferry {
    /// Load the configuration, build the broker TLS context, then connect the
    /// mail provider and the broker, in that order.
    ///
    /// # Errors
    ///
    /// Any startup failure. Nothing is left connected when this fails.
    pub async fn init(parameters: &Parameters) -> anyhow::Result<Self> {
        let settings = Settings::load(parameters)?;
        tracing::debug!("Loaded {settings:#?}");

        let tls = TlsContext::from_config(&settings.broker)?;

        let mailer = SesMailer::connect(&settings.ses).await?;

        let broker = match AmqpBroker::connect_with(
            &settings.broker,
            tls,
            SHUTDOWN_BROADCAST.subscribe(),
        )
        .await
        {
            Ok(broker) => broker,
            Err(err) => {
                if let Err(close) = mailer.close().await {
                    tracing::error!("Failed to close the mail provider: {close}");
                }
                return Err(err.into());
            }
        };

        Ok(Self {
            relay: Relay::new(broker, mailer, settings.policy),
        })
    }

    /// Run the delivery loop on its own task until it terminates.
    ///
    /// SIGINT or SIGTERM interrupts the loop; a second SIGINT while the loop
    /// is winding down gives up waiting for it.
    ///
    /// # Errors
    ///
    /// Fails if the worker panicked or shutdown was forced. A forced shutdown
    /// leaves the broker and mail provider to be dropped with the process.
    pub async fn run(self) -> anyhow::Result<Termination> {
        let mut worker = tokio::spawn(self.relay.run());

        internal!(level = INFO, "Relay running");

        tokio::select! {
            termination = &mut worker => {
                return termination.context("Delivery loop panicked");
            }
            r = shutdown() => {
                if let Err(err) = r {
                    tracing::error!("Unable to signal the delivery loop: {err}");
                }
            }
        }

        internal!(level = INFO, "Shutting down...");

        tokio::select! {
            termination = &mut worker => termination.context("Delivery loop panicked"),
            _ = tokio::signal::ctrl_c() => {
                Err(anyhow::anyhow!("Shutdown forced before the delivery loop stopped"))
            }
        }
    }
}

/// Whether the process should report success for this outcome.
pub fn is_success(outcome: &anyhow::Result<Termination>) -> bool {
    matches!(outcome, Ok(termination) if termination.is_interrupted())
}

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Interrupt)
        .context("No worker is listening for the interrupt")?;

    Ok(())
}
