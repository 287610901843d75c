use std::{path::PathBuf, str::FromStr};

use tracing::metadata::LevelFilter;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// File name of the structured log inside `LOG_DIR`.
pub const LOG_FILE_NAME: &str = "ferry.log";

const DEFAULT_LOG_DIR: &str = "logs";

/// Rotated files kept in `LOG_DIR`; older ones are removed.
pub const MAX_LOG_FILES: usize = 14;

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!(target: "ferry", $level, $span);
        let _enter = span.enter();

        $crate::tracing::event!(target: "ferry", $level, $($msg),*)
    }};
}

/// Events about deliveries arriving from the broker.
#[macro_export]
macro_rules! inbound {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "inbound", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::inbound!(level = TRACE, $($msg),*)
    };
}

/// Events about mail handed to the mail provider.
#[macro_export]
macro_rules! outbound {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "outbound", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::outbound!(level = TRACE, $($msg),*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Keeps the structured log writer alive; pending lines are flushed on drop.
#[must_use = "dropping the guard stops the structured log sink"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn level_from_env() -> LevelFilter {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    })
}

fn log_dir_from_env() -> Option<PathBuf> {
    match std::env::var("LOG_DIR") {
        Ok(dir) if dir.trim().is_empty() => None,
        Ok(dir) => Some(PathBuf::from(dir)),
        Err(_) => Some(PathBuf::from(DEFAULT_LOG_DIR)),
    }
}

/// The daily-rolling appender under `dir`, or `None` (with a warning on
/// stderr) when the directory cannot be created or opened.
fn file_appender(dir: PathBuf) -> Option<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_NAME)
        .max_log_files(MAX_LOG_FILES)
        .build(&dir)
        .map_err(|e| {
            eprintln!(
                "Unable to write logs to {}: {e}, continuing with console logging only",
                dir.display()
            );
        })
        .ok()
}

fn is_ferry_event(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.target().starts_with("ferry")
}

/// Install the console sink and the structured (JSON) file sink.
///
/// Level comes from `LOG_LEVEL`; the file sink is a daily-rolling
/// [`LOG_FILE_NAME`] under `LOG_DIR` (default `logs`, empty disables it).
/// If that directory is unusable only the console sink is installed.
pub fn init() -> LogGuard {
    let level = level_from_env();

    let appender = log_dir_from_env().and_then(file_appender);
    let (file_layer, file_guard) = appender.map_or((None, None), |appender| {
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .with_filter(level)
            .with_filter(FilterFn::new(is_ferry_event));

        (Some(layer), Some(guard))
    });

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(is_ferry_event)),
        )
        .with(file_layer)
        .init();

    LogGuard { _file: file_guard }
}
