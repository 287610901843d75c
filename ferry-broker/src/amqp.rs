//! AMQP 0-9-1 implementation of [`Broker`].

use amqprs::{
    channel::{BasicAckArguments, BasicConsumeArguments, Channel, ConsumerMessage},
    connection::{Connection, OpenConnectionArguments},
    tls::TlsAdaptor,
};
use async_trait::async_trait;
use ferry_common::{Signal, inbound, internal, tracing};
use tokio::sync::{broadcast, mpsc::UnboundedReceiver};

use crate::{
    BrokerConfig, Delivery, DeliveryTag, Received,
    delivery::Broker,
    error::{BrokerError, Result},
    tls::TlsContext,
};

/// One connection, one channel, one consumer on the configured queue.
///
/// Consumption uses explicit acknowledgement. The worker that owns this value
/// is the only code that touches the connection; the supervising process
/// reaches it only through the interrupt broadcast handed over at connect.
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
    consumer: UnboundedReceiver<ConsumerMessage>,
    consumer_tag: String,
    interrupt: broadcast::Receiver<Signal>,
}

impl AmqpBroker {
    /// Build the TLS context (if enabled), open a connection and channel, and
    /// start consuming `queueName` without auto-ack.
    ///
    /// TLS material is validated and loaded before any socket is opened.
    ///
    /// # Errors
    ///
    /// Any TLS, connection, channel, or consume failure. Partially opened
    /// resources are closed before returning.
    pub async fn connect(
        config: &BrokerConfig,
        interrupt: broadcast::Receiver<Signal>,
    ) -> Result<Self> {
        let tls = TlsContext::from_config(config)?;
        Self::connect_with(config, tls, interrupt).await
    }

    /// As [`AmqpBroker::connect`], with a TLS context built beforehand.
    ///
    /// # Errors
    ///
    /// Any connection, channel, or consume failure.
    pub async fn connect_with(
        config: &BrokerConfig,
        tls: Option<TlsContext>,
        interrupt: broadcast::Receiver<Signal>,
    ) -> Result<Self> {
        let mut args = OpenConnectionArguments::new(
            &config.host,
            config.port,
            &config.username,
            &config.password,
        );
        args.virtual_host(&config.vhost);

        if let Some(tls) = tls {
            let (connector, domain) = tls.into_parts();
            args.tls_adaptor(TlsAdaptor::new(connector, domain));
        }

        tracing::debug!(
            "Connecting to {} with user={} to vhost={}",
            config.address(),
            config.username,
            config.vhost
        );

        let connection = Connection::open(&args)
            .await
            .map_err(|e| BrokerError::Connect {
                address: config.address(),
                reason: e.to_string(),
            })?;

        let channel = match connection.open_channel(None).await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close) = connection.close().await {
                    tracing::warn!("Failed to close connection after channel error: {close}");
                }
                return Err(BrokerError::OpenChannel(e.to_string()));
            }
        };

        let mut consume = BasicConsumeArguments::new(&config.queue_name, &config.consumer_tag);
        consume.no_ack = false;

        let (consumer_tag, consumer) = match channel.basic_consume_rx(consume).await {
            Ok(consuming) => consuming,
            Err(e) => {
                if let Err(close) = channel.close().await {
                    tracing::warn!("Failed to close channel after consume error: {close}");
                }
                if let Err(close) = connection.close().await {
                    tracing::warn!("Failed to close connection after consume error: {close}");
                }
                return Err(BrokerError::Consume {
                    queue: config.queue_name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        internal!(
            level = INFO,
            "Consuming {} on {} as {consumer_tag}",
            config.queue_name,
            config.address()
        );

        Ok(Self {
            connection,
            channel,
            consumer,
            consumer_tag,
            interrupt,
        })
    }

    fn shutdown_reason(&self) -> String {
        if !self.connection.is_open() {
            "connection closed".to_string()
        } else if !self.channel.is_open() {
            "channel closed".to_string()
        } else {
            format!("consumer {} cancelled", self.consumer_tag)
        }
    }

    fn into_delivery(message: ConsumerMessage) -> Result<Delivery> {
        let deliver = message
            .deliver
            .ok_or_else(|| BrokerError::Receive("message frame without delivery".to_string()))?;

        Ok(Delivery::new(
            deliver.delivery_tag(),
            message.content.unwrap_or_default(),
            deliver.redelivered(),
        ))
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn next_delivery(&mut self) -> Result<Received> {
        tokio::select! {
            biased;

            signal = self.interrupt.recv() => {
                internal!(level = INFO, "Interrupted while waiting for a delivery: {signal:?}");
                Ok(Received::Interrupted)
            }

            message = self.consumer.recv() => match message {
                Some(message) => {
                    let delivery = Self::into_delivery(message)?;
                    inbound!(
                        level = DEBUG,
                        "Delivery {} ({} bytes, redelivered={})",
                        delivery.tag,
                        delivery.body.len(),
                        delivery.redelivered
                    );
                    Ok(Received::Delivery(delivery))
                }
                None => Ok(Received::Shutdown(self.shutdown_reason())),
            },
        }
    }

    async fn ack(&mut self, tag: DeliveryTag) -> Result<()> {
        self.channel
            .basic_ack(BasicAckArguments::new(tag.get(), false))
            .await
            .map_err(|e| BrokerError::Ack {
                tag,
                reason: e.to_string(),
            })
    }

    async fn close(self) -> Result<()> {
        let Self {
            connection,
            channel,
            ..
        } = self;

        let mut outcome = Ok(());

        if let Err(e) = channel.close().await {
            tracing::error!("There was an error while trying to close the channel: {e}");
            outcome = Err(BrokerError::CloseChannel(e.to_string()));
        }

        if let Err(e) = connection.close().await {
            tracing::error!("There was an error while trying to close the connection: {e}");
            outcome = outcome.and(Err(BrokerError::CloseConnection(e.to_string())));
        }

        internal!("Broker connection closed");

        outcome
    }
}
