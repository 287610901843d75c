//! Broker side of the relay.
//!
//! - [`TlsContext`]: optional mutually-authenticated transport
//! - [`Broker`]: the receive / ack / close seam the delivery loop drives
//! - [`AmqpBroker`]: one connection and one channel consuming a queue

mod amqp;
mod config;
mod delivery;
mod error;
mod jks;
mod tls;

pub use amqp::AmqpBroker;
pub use config::BrokerConfig;
pub use delivery::{Broker, Delivery, DeliveryTag, Received};
pub use error::{BrokerError, Result, TlsError};
pub use tls::{TlsContext, TlsMaterial};
