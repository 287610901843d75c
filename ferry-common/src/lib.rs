//! Pieces shared by every ferry crate: `.properties` configuration loading,
//! logging, the state machine trait, and the process-wide interrupt signal.

pub mod error;
pub mod logging;
pub mod properties;
pub mod traits;

pub use error::ConfigError;
pub use properties::Properties;
pub use tracing;

/// Signals broadcast from the supervising process to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop waiting for deliveries and wind down.
    Interrupt,
}
