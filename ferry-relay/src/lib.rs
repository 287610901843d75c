//! Queue-to-mail delivery loop.
//!
//! A [`Relay`] takes one delivery at a time from a broker, decodes it into an
//! [`EmailRequest`], hands it to the mail provider and acknowledges it.
//!
//! Acknowledgement rules:
//! - a delivery that cannot be decoded is never acknowledged, so the broker
//!   redelivers it
//! - a delivery whose email could not be sent is acknowledged unless
//!   [`RelayPolicy::ack_on_forward_failure`] is off
//! - a failed acknowledgement stops the loop

mod message;
mod policy;
mod relay;
pub mod state;
mod termination;

pub use message::{DecodeError, EmailRequest, decode};
pub use policy::RelayPolicy;
pub use relay::Relay;
pub use termination::Termination;
