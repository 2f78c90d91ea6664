//! In-memory log capture for the dashboard log pane
//!
//! Two sources feed the same ring buffer: the coordinator's own `tracing`
//! output (through [`LogMakeWriter`]) and diagnostic events relayed from
//! workers (through [`LogBuffer::push_event`]). Every line keeps its
//! severity so the pane can colour it.

use crate::events::{Severity, TelemetryEvent};
use crate::worker::capture::severity_for;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::Metadata;

/// Maximum number of log lines to keep in memory
const MAX_LOG_LINES: usize = 1000;

/// One captured line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub severity: Severity,
    pub text: String,
}

/// Shared log buffer accessible by both tracing subscriber and dashboard
#[derive(Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<LogLine>>>,
}

impl LogBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES))),
        }
    }

    /// Add a line, evicting the oldest when full
    pub fn push(&self, severity: Severity, text: impl Into<String>) {
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() >= MAX_LOG_LINES {
                lines.pop_front();
            }
            lines.push_back(LogLine {
                severity,
                text: text.into(),
            });
        }
    }

    /// Record a worker diagnostic; stats and serializer info are ignored
    pub fn push_event(&self, event: &TelemetryEvent) {
        if let Some(severity) = event.event.severity() {
            self.push(severity, event.to_string());
        }
    }

    /// Most recent `count` lines, oldest first (copied out of the lock)
    #[must_use]
    pub fn recent_lines(&self, count: usize) -> Vec<LogLine> {
        if let Ok(lines) = self.lines.lock() {
            let skip = lines.len().saturating_sub(count);
            lines.iter().skip(skip).cloned().collect()
        } else {
            Vec::new()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().map_or(0, |lines| lines.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer").field("lines", &self.len()).finish()
    }
}

/// Writer that appends complete lines to a [`LogBuffer`]
pub struct LogWriter {
    buffer: LogBuffer,
    severity: Severity,
    line_buffer: String,
}

impl LogWriter {
    #[must_use]
    pub fn new(buffer: LogBuffer, severity: Severity) -> Self {
        Self {
            buffer,
            severity,
            line_buffer: String::with_capacity(256),
        }
    }

    fn push_line(&mut self) {
        if !self.line_buffer.trim().is_empty() {
            self.buffer.push(self.severity, self.line_buffer.trim_end());
        }
        self.line_buffer.clear();
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        for c in s.chars() {
            if c == '\n' {
                self.push_line();
            } else {
                self.line_buffer.push(c);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.push_line();
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.push_line();
    }
}

/// MakeWriter implementation for tracing_subscriber
#[derive(Clone)]
pub struct LogMakeWriter {
    buffer: LogBuffer,
}

impl LogMakeWriter {
    #[must_use]
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::new(self.buffer.clone(), Severity::Info)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        LogWriter::new(self.buffer.clone(), severity_for(meta.level()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WorkerEvent;
    use crate::metrics::StatsSnapshot;
    use crate::types::WorkerId;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let buffer = LogBuffer::new();
        for i in 0..(MAX_LOG_LINES + 5) {
            buffer.push(Severity::Info, format!("line {i}"));
        }
        assert_eq!(buffer.len(), MAX_LOG_LINES);
        let recent = buffer.recent_lines(2);
        assert_eq!(recent[0].text, format!("line {}", MAX_LOG_LINES + 3));
        assert_eq!(recent[1].text, format!("line {}", MAX_LOG_LINES + 4));
    }

    #[test]
    fn test_recent_lines_more_than_available() {
        let buffer = LogBuffer::new();
        buffer.push(Severity::Warning, "only");
        let recent = buffer.recent_lines(50);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].severity, Severity::Warning);
    }

    #[test]
    fn test_writer_splits_lines_and_flushes_tail() {
        let buffer = LogBuffer::new();
        {
            let mut writer = LogWriter::new(buffer.clone(), Severity::Error);
            writer.write_all(b"first\n\nsecond\nthi").unwrap();
            writer.write_all(b"rd").unwrap();
        }
        let texts: Vec<String> = buffer.recent_lines(10).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(buffer.recent_lines(10).iter().all(|l| l.severity == Severity::Error));
    }

    #[test]
    fn test_push_event_skips_stats() {
        let buffer = LogBuffer::new();
        let worker = WorkerId::from_index(1);
        buffer.push_event(&TelemetryEvent {
            worker,
            event: WorkerEvent::StatsSnapshot(StatsSnapshot::default()),
        });
        buffer.push_event(&TelemetryEvent {
            worker,
            event: WorkerEvent::connection_error(3, "refused"),
        });
        let lines = buffer.recent_lines(10);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].severity, Severity::Error);
        assert_eq!(lines[0].text, "[worker-1] client #3: refused");
    }

    #[test]
    fn test_subscriber_routes_levels() {
        use tracing_subscriber::layer::SubscriberExt;

        let buffer = LogBuffer::new();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(LogMakeWriter::new(buffer.clone()))
                .with_ansi(false)
                .without_time(),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("plain");
            tracing::warn!("careful");
            tracing::error!("broken");
        });

        let severities: Vec<Severity> = buffer.recent_lines(10).into_iter().map(|l| l.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Warning, Severity::Error]);
    }
}
