//! The single-worker delivery loop.

use std::time::Duration;

use ferry_broker::{Broker, Delivery, DeliveryTag, Received};
use ferry_common::{inbound, internal, outbound, traits::FiniteStateMachine, tracing};
use ferry_mailer::Mailer;

use crate::{
    EmailRequest, RelayPolicy, Termination, message,
    state::{Context, Event, State},
};

/// Moves email requests from a [`Broker`] to a [`Mailer`], one delivery at a
/// time.
///
/// The relay owns both resources. They are released by [`Relay::run`] once
/// the loop stops, whatever the reason.
pub struct Relay<B, M> {
    broker: B,
    mailer: M,
    context: Context,
}

impl<B: Broker, M: Mailer> Relay<B, M> {
    pub fn new(broker: B, mailer: M, policy: RelayPolicy) -> Self {
        Self {
            broker,
            mailer,
            context: Context::new(policy),
        }
    }

    /// Run until the loop terminates, then close the broker and the mailer.
    ///
    /// Each delivery is decoded, forwarded and acknowledged before the next
    /// one is requested.
    pub async fn run(mut self) -> Termination {
        internal!(level = INFO, "Delivery loop started with {:?}", self.context.policy);

        let mut state = State::WaitingForDelivery;

        let termination = loop {
            let event = match state {
                State::Terminated(termination) => break termination,
                State::WaitingForDelivery => self.receive().await,
                State::Decoding(ref delivery) => decode(delivery),
                State::Forwarding { tag, ref request } => {
                    forward(&self.mailer, &self.context.policy, tag, request).await
                }
                State::Acknowledging(tag) => self.acknowledge(tag).await,
            };
            let shutdown = matches!(event, Event::Received(Received::Shutdown(_)));

            state = state.transition(event, &mut self.context);

            if shutdown && !state.is_terminated() {
                back_off(self.context.policy.shutdown_retry_backoff()).await;
            }
        };

        let progress = self.context.progress;
        internal!(
            level = INFO,
            "Delivery loop stopped ({termination}): received={} forwarded={} acknowledged={} undecodable={} unsent={}",
            progress.received,
            progress.forwarded,
            progress.acknowledged,
            progress.undecodable,
            progress.unsent
        );

        self.release().await;

        termination
    }

    async fn receive(&mut self) -> Event {
        match self.broker.next_delivery().await {
            Ok(Received::Shutdown(reason)) => {
                tracing::warn!("Broker signalled shutdown while waiting: {reason}");
                Event::Received(Received::Shutdown(reason))
            }
            Ok(received) => Event::Received(received),
            Err(err) => {
                tracing::error!("Failed to receive delivery: {err}");
                Event::ReceiveFailed(err)
            }
        }
    }

    async fn acknowledge(&mut self, tag: DeliveryTag) -> Event {
        match self.broker.ack(tag).await {
            Ok(()) => {
                inbound!("Delivery {tag}: acknowledged");
                Event::Acknowledged
            }
            Err(err) => {
                tracing::error!("Delivery {tag}: {err}");
                Event::AckFailed(err)
            }
        }
    }

    /// Close the broker and then the mailer. A failure closing one is logged
    /// and does not stop the other from being closed.
    async fn release(self) {
        let Self { broker, mailer, .. } = self;

        if let Err(err) = broker.close().await {
            tracing::error!("Failed to close the broker connection: {err}");
        }

        if let Err(err) = mailer.close().await {
            tracing::error!("Failed to close the mail provider: {err}");
        }

        internal!(level = INFO, "Broker and mail provider released");
    }
}

fn decode(delivery: &Delivery) -> Event {
    match message::decode(&delivery.body) {
        Ok(request) => {
            inbound!(
                level = DEBUG,
                "Delivery {}: request from {} to {}",
                delivery.tag,
                request.from,
                request.to
            );
            Event::Decoded(request)
        }
        Err(err) => {
            tracing::warn!(
                "Delivery {} (redelivered={}): {err}, not acknowledging",
                delivery.tag,
                delivery.redelivered
            );
            Event::DecodeFailed(err)
        }
    }
}

async fn forward<M: Mailer>(
    mailer: &M,
    policy: &RelayPolicy,
    tag: DeliveryTag,
    request: &EmailRequest,
) -> Event {
    match mailer
        .send(&request.from, &request.to, &request.subject, &request.text)
        .await
    {
        Ok(()) => {
            outbound!(
                level = INFO,
                "Delivery {tag}: sent from {} to {}",
                request.from,
                request.to
            );
            Event::Forwarded
        }
        Err(err) => {
            let outcome = if policy.ack_on_forward_failure {
                "dropping"
            } else {
                "leaving unacknowledged"
            };

            // A bad message fails the same way on every redelivery.
            if err.is_message_error() {
                tracing::warn!(
                    "Delivery {tag}: message for {} rejected, {outcome}: {err}",
                    request.to
                );
            } else {
                tracing::error!(
                    "Delivery {tag}: failed to send to {}, {outcome}: {err}",
                    request.to
                );
            }
            Event::ForwardFailed(err)
        }
    }
}

async fn back_off(backoff: Duration) {
    if backoff.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(backoff).await;
    }
}
