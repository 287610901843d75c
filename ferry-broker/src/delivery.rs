//! The broker seam used by the delivery loop.

use core::fmt::{self, Display, Formatter};

use async_trait::async_trait;

use crate::error::Result;

/// Opaque tag identifying one delivery on its channel, used to acknowledge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryTag(u64);

impl DeliveryTag {
    pub const fn new(tag: u64) -> Self {
        Self(tag)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for DeliveryTag {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, fmt)
    }
}

impl From<u64> for DeliveryTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

/// One message pulled from the broker.
///
/// The body is opaque here; decoding happens in the delivery loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub body: Vec<u8>,
    pub redelivered: bool,
}

impl Delivery {
    pub fn new<T: Into<DeliveryTag>>(tag: T, body: Vec<u8>, redelivered: bool) -> Self {
        Self {
            tag: tag.into(),
            body,
            redelivered,
        }
    }
}

/// Outcome of waiting for the next delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A message arrived.
    Delivery(Delivery),
    /// The channel or connection was closed underneath the consumer.
    Shutdown(String),
    /// The supervising process asked the worker to stop.
    Interrupted,
}

/// A single consumer on a single channel, consumed with explicit acks.
///
/// Implementations are owned by exactly one worker. Once `next_delivery` has
/// reported [`Received::Shutdown`] the broker stays unusable; nothing here
/// reconnects.
#[async_trait]
pub trait Broker: Send {
    /// Wait, without a timeout, for the next delivery or a stop condition.
    ///
    /// # Errors
    ///
    /// An error is a receive failure and is fatal to the consumer.
    async fn next_delivery(&mut self) -> Result<Received>;

    /// Acknowledge exactly one delivery (never multiple).
    ///
    /// # Errors
    ///
    /// Fails if the acknowledgement could not be sent.
    async fn ack(&mut self, tag: DeliveryTag) -> Result<()>;

    /// Close the channel and then the connection.
    ///
    /// Both steps are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure after every step has been attempted.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
