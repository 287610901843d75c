use core::fmt::{self, Display, Formatter};

use ferry_broker::{BrokerError, DeliveryTag};

/// Why the delivery loop stopped.
#[derive(Debug)]
pub enum Termination {
    /// The supervising process asked the loop to stop.
    Interrupted,

    /// Waiting for the next delivery failed at the connection level.
    ReceiveFailed(BrokerError),

    /// A delivery could not be acknowledged; the channel state is unknown.
    AckFailed {
        tag: DeliveryTag,
        source: BrokerError,
    },

    /// The broker kept signalling shutdown past the configured retry limit.
    ShutdownRetriesExhausted { attempts: u32 },
}

impl Termination {
    /// Returns `true` for the only clean shutdown path.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl Display for Termination {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(fmt, "interrupted"),
            Self::ReceiveFailed(err) => write!(fmt, "receive failed: {err}"),
            Self::AckFailed { source, .. } => write!(fmt, "{source}"),
            Self::ShutdownRetriesExhausted { attempts } => write!(
                fmt,
                "broker still shut down after {attempts} consecutive retries"
            ),
        }
    }
}
