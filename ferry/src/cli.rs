//! Command-line surface: `ferry ses=<path> rmq=<path>`.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

pub const USAGE: &str =
    "Usage: ferry ses=/path/to/aws_ses.properties rmq=/path/to/rabbitmq.properties";

/// Relay email requests from a RabbitMQ queue to Amazon SES
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
pub struct Cli {
    /// `ses=<path>` for the mail provider settings and `rmq=<path>` for the
    /// broker settings; anything else is ignored
    #[arg(value_name = "KEY=PATH", allow_hyphen_values = true)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Parameters not specified")]
    NotSpecified,

    #[error("File with parameters for {0} not specified")]
    Missing(&'static str),
}

/// The two configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub ses: PathBuf,
    pub rmq: PathBuf,
}

impl Parameters {
    /// Pick `ses=` and `rmq=` out of the arguments.
    ///
    /// Other arguments are ignored and a repeated key keeps its last value.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two arguments or when either key is absent.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, UsageError> {
        if args.len() < 2 {
            return Err(UsageError::NotSpecified);
        }

        let mut ses = None;
        let mut rmq = None;

        for arg in args {
            let arg = arg.as_ref();
            if let Some(path) = arg.strip_prefix("ses=") {
                ses = Some(PathBuf::from(path));
            } else if let Some(path) = arg.strip_prefix("rmq=") {
                rmq = Some(PathBuf::from(path));
            }
        }

        Ok(Self {
            ses: ses.ok_or(UsageError::Missing("AWS SES"))?,
            rmq: rmq.ok_or(UsageError::Missing("RabbitMQ"))?,
        })
    }
}

impl TryFrom<&Cli> for Parameters {
    type Error = UsageError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        Self::from_args(&cli.parameters)
    }
}
