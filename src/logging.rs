//! Logging setup for the coordinator and for worker processes
//!
//! The coordinator logs to `loadtest.log` plus either stdout (headless) or
//! the dashboard's in-memory buffer. A worker process must keep stdout for
//! its event stream, so its log lines become events instead.

use crate::events::EventSink;
use crate::tui::{LogBuffer, LogMakeWriter};
use crate::worker::EventMakeWriter;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// File the coordinator appends its log to
pub const LOG_FILE: &str = "loadtest.log";

/// `RUST_LOG`, or `info` when unset or invalid
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Plain-text layer for the log file
fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(env_filter())
}

/// Initialize coordinator logging: console or dashboard buffer, plus the log file
///
/// Returns the dashboard buffer when not headless. Keep the guard alive for
/// the life of the program or buffered file output is lost.
pub fn init_coordinator_logging(headless: bool) -> (Option<LogBuffer>, WorkerGuard) {
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    if headless {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_filter(env_filter()),
            )
            .with(file_layer(non_blocking))
            .init();
        return (None, guard);
    }

    let log_buffer = LogBuffer::new();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(LogMakeWriter::new(log_buffer.clone()))
                .with_ansi(false)
                .with_target(false)
                .compact()
                .with_filter(env_filter()),
        )
        .with(file_layer(non_blocking))
        .init();

    (Some(log_buffer), guard)
}

/// Initialize logging inside a worker process
///
/// Every formatted line is emitted through `sink` as a log, warning or
/// error event according to its level. Nothing is written to the file:
/// the coordinator records what it receives.
pub fn init_worker_logging(sink: EventSink) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(EventMakeWriter::new(sink))
                .with_ansi(false)
                .with_target(false)
                .without_time()
                .compact()
                .with_filter(env_filter()),
        )
        .init();
}
