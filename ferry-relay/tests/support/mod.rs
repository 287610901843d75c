//! In-memory broker and mailer used to drive the delivery loop.
#![allow(dead_code)] // not every test uses every helper

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use ferry_broker::{Broker, BrokerError, Delivery, DeliveryTag, Received};
use ferry_mailer::{Mailer, MailerError};
use ferry_relay::EmailRequest;
use prost::Message;
use tokio::sync::{mpsc, watch};

/// Declares a 16 byte `from` field but carries a single byte.
pub const MALFORMED: &[u8] = &[0x0a, 0x10, b'a'];

pub fn email(from: &str, to: &str, subject: &str, text: &str) -> Vec<u8> {
    EmailRequest {
        from: from.to_string(),
        to: to.to_string(),
        subject: subject.to_string(),
        text: text.to_string(),
    }
    .encode_to_vec()
}

pub fn hello() -> Vec<u8> {
    email("a@x.com", "b@x.com", "hi", "body")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Everything the loop did to the fakes.
#[derive(Debug, Default)]
pub struct Journal {
    pub acks: Vec<DeliveryTag>,
    pub sends: Vec<Sent>,
    pub broker_closes: usize,
    pub mailer_closes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SharedJournal(Arc<Mutex<Journal>>);

impl SharedJournal {
    pub fn lock(&self) -> MutexGuard<'_, Journal> {
        self.0.lock().unwrap()
    }

    pub fn acks(&self) -> Vec<u64> {
        self.lock().acks.iter().map(|tag| tag.get()).collect()
    }

    pub fn sends(&self) -> Vec<Sent> {
        self.lock().sends.clone()
    }

    pub fn closes(&self) -> (usize, usize) {
        let journal = self.lock();
        (journal.broker_closes, journal.mailer_closes)
    }
}

pub enum Step {
    Deliver(Delivery),
    Shutdown(&'static str),
    Interrupt,
    Fail(&'static str),
}

/// Feeds the broker and observes how often the loop waited on it.
pub struct Script {
    steps: mpsc::UnboundedSender<Step>,
    waits: watch::Receiver<usize>,
}

impl Script {
    pub fn deliver(&self, tag: u64, body: &[u8]) -> &Self {
        self.push(Step::Deliver(Delivery::new(tag, body.to_vec(), false)))
    }

    pub fn redeliver(&self, tag: u64, body: &[u8]) -> &Self {
        self.push(Step::Deliver(Delivery::new(tag, body.to_vec(), true)))
    }

    pub fn shutdown(&self) -> &Self {
        self.push(Step::Shutdown("channel closed"))
    }

    pub fn interrupt(&self) -> &Self {
        self.push(Step::Interrupt)
    }

    pub fn fail(&self, reason: &'static str) -> &Self {
        self.push(Step::Fail(reason))
    }

    fn push(&self, step: Step) -> &Self {
        assert!(self.steps.send(step).is_ok(), "the broker was dropped");
        self
    }

    /// Wait until the loop has asked for its `count`th delivery.
    pub async fn waiting_for(&mut self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), self.waits.wait_for(|n| *n >= count))
            .await
            .expect("the loop never waited for another delivery")
            .unwrap();
    }
}

pub struct ScriptedBroker {
    steps: mpsc::UnboundedReceiver<Step>,
    waits: watch::Sender<usize>,
    journal: SharedJournal,
    failing_ack: Option<DeliveryTag>,
    failing_close: bool,
}

impl ScriptedBroker {
    pub fn new(journal: &SharedJournal) -> (Self, Script) {
        let (sender, steps) = mpsc::unbounded_channel();
        let (waits, observer) = watch::channel(0);

        (
            Self {
                steps,
                waits,
                journal: journal.clone(),
                failing_ack: None,
                failing_close: false,
            },
            Script {
                steps: sender,
                waits: observer,
            },
        )
    }

    pub fn failing_ack(mut self, tag: u64) -> Self {
        self.failing_ack = Some(DeliveryTag::new(tag));
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }
}

#[async_trait]
impl Broker for ScriptedBroker {
    async fn next_delivery(&mut self) -> ferry_broker::Result<Received> {
        self.waits.send_modify(|n| *n += 1);

        match self.steps.recv().await {
            Some(Step::Deliver(delivery)) => Ok(Received::Delivery(delivery)),
            Some(Step::Shutdown(reason)) => Ok(Received::Shutdown(reason.to_string())),
            Some(Step::Interrupt) => Ok(Received::Interrupted),
            Some(Step::Fail(reason)) => Err(BrokerError::Receive(reason.to_string())),
            // Nothing more scripted: block like an idle queue.
            None => std::future::pending().await,
        }
    }

    async fn ack(&mut self, tag: DeliveryTag) -> ferry_broker::Result<()> {
        if self.failing_ack == Some(tag) {
            return Err(BrokerError::Ack {
                tag,
                reason: "connection reset by peer".to_string(),
            });
        }

        self.journal.lock().acks.push(tag);
        Ok(())
    }

    async fn close(self) -> ferry_broker::Result<()> {
        self.journal.lock().broker_closes += 1;

        if self.failing_close {
            Err(BrokerError::CloseChannel("channel already closed".to_string()))
        } else {
            Ok(())
        }
    }
}

pub struct RecordingMailer {
    journal: SharedJournal,
    failing_recipient: Option<String>,
    failing_close: bool,
}

impl RecordingMailer {
    pub fn new(journal: &SharedJournal) -> Self {
        Self {
            journal: journal.clone(),
            failing_recipient: None,
            failing_close: false,
        }
    }

    pub fn failing_send_to(mut self, to: &str) -> Self {
        self.failing_recipient = Some(to.to_string());
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        body: &str,
    ) -> ferry_mailer::Result<()> {
        self.journal.lock().sends.push(Sent {
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        if self.failing_recipient.as_deref() == Some(to) {
            Err(MailerError::Send("554 Message rejected".to_string()))
        } else {
            Ok(())
        }
    }

    async fn close(self) -> ferry_mailer::Result<()> {
        self.journal.lock().mailer_closes += 1;

        if self.failing_close {
            Err(MailerError::Send("421 closing transmission channel".to_string()))
        } else {
            Ok(())
        }
    }
}
