//! States of the delivery loop and the pure transitions between them.
//!
//! The loop performs one effect per state (receive, decode, send, ack) and
//! feeds its outcome back as an [`Event`]. [`State::transition`] decides what
//! happens next without doing any I/O, so every acknowledgement decision can
//! be checked in isolation.

use ferry_broker::{BrokerError, Delivery, DeliveryTag, Received};
use ferry_common::traits::FiniteStateMachine;
use ferry_mailer::MailerError;

use crate::{DecodeError, EmailRequest, RelayPolicy, Termination};

#[derive(Debug)]
pub enum State {
    WaitingForDelivery,
    Decoding(Delivery),
    Forwarding {
        tag: DeliveryTag,
        request: EmailRequest,
    },
    Acknowledging(DeliveryTag),
    Terminated(Termination),
}

/// Outcome of the effect performed in the current state.
#[derive(Debug)]
pub enum Event {
    Received(Received),
    ReceiveFailed(BrokerError),
    Decoded(EmailRequest),
    DecodeFailed(DecodeError),
    Forwarded,
    ForwardFailed(MailerError),
    Acknowledged,
    AckFailed(BrokerError),
}

/// Counters carried across iterations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub forwarded: u64,
    pub acknowledged: u64,
    pub undecodable: u64,
    pub unsent: u64,
    /// Shutdown signals retried since the last delivery.
    pub shutdown_retries: u32,
}

#[derive(Debug, Default)]
pub struct Context {
    pub policy: RelayPolicy,
    pub progress: Progress,
}

impl Context {
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            policy,
            progress: Progress::default(),
        }
    }
}

impl State {
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    fn on_received(received: Received, context: &mut Context) -> Self {
        match received {
            Received::Delivery(delivery) => {
                context.progress.received += 1;
                context.progress.shutdown_retries = 0;
                Self::Decoding(delivery)
            }
            Received::Interrupted => Self::Terminated(Termination::Interrupted),
            Received::Shutdown(_) => {
                let retries = context.progress.shutdown_retries;
                if context.policy.may_retry_shutdown(retries) {
                    context.progress.shutdown_retries = retries + 1;
                    Self::WaitingForDelivery
                } else {
                    Self::Terminated(Termination::ShutdownRetriesExhausted { attempts: retries })
                }
            }
        }
    }
}

impl FiniteStateMachine for State {
    type Input = Event;
    type Context = Context;

    /// Events that do not belong to the current state leave it unchanged.
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self {
        match (self, input) {
            (Self::WaitingForDelivery, Event::Received(received)) => {
                Self::on_received(received, context)
            }
            (Self::WaitingForDelivery, Event::ReceiveFailed(err)) => {
                Self::Terminated(Termination::ReceiveFailed(err))
            }

            (Self::Decoding(delivery), Event::Decoded(request)) => Self::Forwarding {
                tag: delivery.tag,
                request,
            },
            // No ack: the broker redelivers according to its own policy.
            (Self::Decoding(_), Event::DecodeFailed(_)) => {
                context.progress.undecodable += 1;
                Self::WaitingForDelivery
            }

            (Self::Forwarding { tag, .. }, Event::Forwarded) => {
                context.progress.forwarded += 1;
                Self::Acknowledging(tag)
            }
            (Self::Forwarding { tag, .. }, Event::ForwardFailed(_)) => {
                context.progress.unsent += 1;
                if context.policy.ack_on_forward_failure {
                    Self::Acknowledging(tag)
                } else {
                    Self::WaitingForDelivery
                }
            }

            (Self::Acknowledging(_), Event::Acknowledged) => {
                context.progress.acknowledged += 1;
                Self::WaitingForDelivery
            }
            (Self::Acknowledging(tag), Event::AckFailed(source)) => {
                Self::Terminated(Termination::AckFailed { tag, source })
            }

            (state, _) => state,
        }
    }
}
