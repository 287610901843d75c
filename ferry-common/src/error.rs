//! Error types for configuration loading.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading or interpreting a configuration file.
///
/// Every variant is fatal at startup: the relay never enters its delivery
/// loop with a configuration it could not fully read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid properties syntax.
    #[error("Unable to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: java_properties::PropertiesError,
    },

    /// A required key is missing or a value could not be interpreted.
    #[error("Invalid configuration in {origin}: {source}")]
    Invalid {
        origin: String,
        #[source]
        source: serde::de::value::Error,
    },
}

/// Specialized `Result` type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
