//! Diagnostic capture for worker processes
//!
//! A worker process's stdout carries its event stream, so log output must
//! not go there directly. [`EventMakeWriter`] plugs into
//! `tracing_subscriber::fmt` and turns every formatted log line into a
//! `log`, `warning` or `error` event according to the record's level.

use crate::events::{EventSink, Severity, WorkerEvent};
use std::io::{self, Write};
use tracing::{Level, Metadata};

/// Writer that emits each complete line as a worker event
pub struct EventWriter {
    sink: EventSink,
    severity: Severity,
    line_buffer: String,
}

impl EventWriter {
    #[must_use]
    pub fn new(sink: EventSink, severity: Severity) -> Self {
        Self {
            sink,
            severity,
            line_buffer: String::with_capacity(256),
        }
    }

    fn emit_line(&mut self) {
        let line = self.line_buffer.trim_end();
        if line.is_empty() {
            self.line_buffer.clear();
            return;
        }
        let event = match self.severity {
            Severity::Info => WorkerEvent::log(line),
            Severity::Warning => WorkerEvent::warning(line),
            Severity::Error => WorkerEvent::error(line),
        };
        self.sink.emit(event);
        self.line_buffer.clear();
    }
}

impl Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        for c in s.chars() {
            if c == '\n' {
                self.emit_line();
            } else {
                self.line_buffer.push(c);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_line();
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        self.emit_line();
    }
}

/// MakeWriter implementation for tracing_subscriber
#[derive(Clone)]
pub struct EventMakeWriter {
    sink: EventSink,
}

impl EventMakeWriter {
    #[must_use]
    pub fn new(sink: EventSink) -> Self {
        Self { sink }
    }
}

/// Map a tracing level onto event severity
#[must_use]
pub fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        _ => Severity::Info,
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for EventMakeWriter {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter::new(self.sink.clone(), Severity::Info)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        EventWriter::new(self.sink.clone(), severity_for(meta.level()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_writer_emits_one_event_per_line() {
        let (sink, mut rx) = EventSink::channel();
        let mut writer = EventWriter::new(sink, Severity::Warning);

        writer.write_all(b"first\nsec").unwrap();
        writer.write_all(b"ond\n").unwrap();

        assert_eq!(rx.try_recv().unwrap(), WorkerEvent::warning("first"));
        assert_eq!(rx.try_recv().unwrap(), WorkerEvent::warning("second"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_partial_line_emitted_on_drop() {
        let (sink, mut rx) = EventSink::channel();
        {
            let mut writer = EventWriter::new(sink, Severity::Error);
            writer.write_all(b"no newline").unwrap();
        }
        assert_eq!(rx.try_recv().unwrap(), WorkerEvent::error("no newline"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let (sink, mut rx) = EventSink::channel();
        let mut writer = EventWriter::new(sink, Severity::Info);
        writer.write_all(b"\n  \n").unwrap();
        writer.flush().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(severity_for(&Level::ERROR), Severity::Error);
        assert_eq!(severity_for(&Level::WARN), Severity::Warning);
        assert_eq!(severity_for(&Level::INFO), Severity::Info);
        assert_eq!(severity_for(&Level::TRACE), Severity::Info);
    }

    #[test]
    fn test_subscriber_routes_by_level() {
        let (sink, mut rx) = EventSink::channel();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(EventMakeWriter::new(sink))
            .with_ansi(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hello");
            tracing::warn!("careful");
            tracing::error!("broken");
        });

        let events: Vec<WorkerEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], WorkerEvent::Log { message } if message.contains("hello")));
        assert!(matches!(&events[1], WorkerEvent::Warning { message } if message.contains("careful")));
        assert!(matches!(&events[2], WorkerEvent::Error { message, .. } if message.contains("broken")));
    }

    #[test]
    fn test_make_writer_default_is_info() {
        let (sink, mut rx) = EventSink::channel();
        let make = EventMakeWriter::new(sink);
        let mut writer = make.make_writer();
        writer.write_all(b"plain\n").unwrap();
        assert_eq!(rx.try_recv().unwrap(), WorkerEvent::log("plain"));
    }
}
