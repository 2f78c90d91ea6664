//! Dashboard state

use super::log_capture::LogBuffer;
use super::system_stats::{SystemMonitor, SystemStats};
use crate::events::{TelemetryEvent, WorkerEvent};
use crate::metrics::AggregateStats;
use crate::plan::LoadPlan;
use std::time::{Duration, Instant};

/// Dashboard state, fed by the coordinator's telemetry
pub struct TuiApp {
    endpoint: String,
    target: String,
    requested_clients: usize,
    realized_clients: usize,
    worker_count: usize,
    serializer: Option<String>,
    started: Instant,
    aggregate: AggregateStats,
    failed: u64,
    finished: bool,
    system: SystemStats,
    monitor: Option<SystemMonitor>,
    logs: LogBuffer,
    log_fullscreen: bool,
}

impl TuiApp {
    #[must_use]
    pub fn builder(plan: &LoadPlan) -> TuiAppBuilder {
        TuiAppBuilder::new(plan)
    }

    /// Replace the aggregate with the latest published value
    pub fn apply_aggregate(&mut self, aggregate: AggregateStats) {
        self.aggregate = aggregate;
    }

    /// Fold a worker event into the display state
    ///
    /// Only failed sessions count as failures. Other errors, such as
    /// worker stderr or crash notices, go to the log pane like every
    /// diagnostic, with its severity.
    pub fn apply_event(&mut self, event: &TelemetryEvent) {
        match &event.event {
            WorkerEvent::SerializerInfo { serializer } => {
                self.serializer = Some(serializer.clone());
            }
            WorkerEvent::Error { session_failed, .. } => {
                if *session_failed {
                    self.failed += 1;
                }
                self.logs.push_event(event);
            }
            WorkerEvent::Log { .. } | WorkerEvent::Warning { .. } => {
                self.logs.push_event(event);
            }
            WorkerEvent::StatsSnapshot(_) => {}
        }
    }

    /// Refresh process resource usage
    pub fn refresh_system(&mut self) {
        if let Some(monitor) = self.monitor.as_mut() {
            self.system = monitor.update();
        }
    }

    /// All workers have exited; numbers are final
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn toggle_log_fullscreen(&mut self) {
        self.log_fullscreen = !self.log_fullscreen;
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn serializer(&self) -> Option<&str> {
        self.serializer.as_deref()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[must_use]
    #[inline]
    pub fn requested_clients(&self) -> usize {
        self.requested_clients
    }

    /// Sessions actually attempted, after rounding up the per-worker share
    #[must_use]
    #[inline]
    pub fn realized_clients(&self) -> usize {
        self.realized_clients
    }

    #[must_use]
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    #[must_use]
    #[inline]
    pub fn aggregate(&self) -> &AggregateStats {
        &self.aggregate
    }

    #[must_use]
    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    #[must_use]
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn system(&self) -> &SystemStats {
        &self.system
    }

    #[must_use]
    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    #[must_use]
    #[inline]
    pub fn is_log_fullscreen(&self) -> bool {
        self.log_fullscreen
    }
}

/// Builder for [`TuiApp`]
pub struct TuiAppBuilder {
    endpoint: String,
    target: String,
    requested_clients: usize,
    realized_clients: usize,
    worker_count: usize,
    logs: Option<LogBuffer>,
    monitor_system: bool,
}

impl TuiAppBuilder {
    fn new(plan: &LoadPlan) -> Self {
        Self {
            endpoint: plan.endpoint.to_string(),
            target: plan.target.to_string(),
            requested_clients: plan.total_clients.get(),
            realized_clients: plan.realized_total(),
            worker_count: plan.worker_count.get(),
            logs: None,
            monitor_system: true,
        }
    }

    /// Share the buffer the tracing subscriber writes into
    #[must_use]
    pub fn with_log_buffer(mut self, logs: LogBuffer) -> Self {
        self.logs = Some(logs);
        self
    }

    /// Skip sysinfo sampling (tests)
    #[must_use]
    pub fn without_system_monitor(mut self) -> Self {
        self.monitor_system = false;
        self
    }

    #[must_use]
    pub fn build(self) -> TuiApp {
        TuiApp {
            endpoint: self.endpoint,
            target: self.target,
            requested_clients: self.requested_clients,
            realized_clients: self.realized_clients,
            worker_count: self.worker_count,
            serializer: None,
            started: Instant::now(),
            aggregate: AggregateStats::default(),
            failed: 0,
            finished: false,
            system: SystemStats::default(),
            monitor: self.monitor_system.then(SystemMonitor::new),
            logs: self.logs.unwrap_or_default(),
            log_fullscreen: false,
        }
    }
}
