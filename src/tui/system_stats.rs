//! Process resource monitoring for the dashboard
//!
//! Memory and CPU are summed over the coordinator and its direct children,
//! so process workers are counted too.

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// Resource usage of the coordinator plus its worker processes
#[derive(Debug, Clone, Default)]
pub struct SystemStats {
    /// CPU usage percentage (per core, can exceed 100.0 on multi-core)
    pub cpu_usage: f32,
    pub peak_cpu_usage: f32,
    /// Resident memory in bytes
    pub memory_bytes: u64,
    pub peak_memory_bytes: u64,
    /// Processes included in the totals
    pub process_count: usize,
}

/// System resource monitor
///
/// Call `update()` periodically. The first CPU sample is zero because
/// sysinfo needs two refreshes to compute usage.
pub struct SystemMonitor {
    system: System,
    pid: Option<Pid>,
    peak_cpu: f32,
    peak_memory: u64,
}

impl SystemMonitor {
    #[must_use]
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()),
        );
        let mut monitor = Self {
            system,
            pid: sysinfo::get_current_pid().ok(),
            peak_cpu: 0.0,
            peak_memory: 0,
        };
        monitor.refresh();
        monitor
    }

    fn refresh(&mut self) {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
    }

    /// Refresh and return current totals
    #[must_use]
    pub fn update(&mut self) -> SystemStats {
        self.refresh();
        let stats = self.current();
        self.peak_cpu = self.peak_cpu.max(stats.cpu_usage);
        self.peak_memory = self.peak_memory.max(stats.memory_bytes);
        SystemStats {
            peak_cpu_usage: self.peak_cpu,
            peak_memory_bytes: self.peak_memory,
            ..stats
        }
    }

    /// Totals from the last refresh
    #[must_use]
    pub fn current(&self) -> SystemStats {
        let Some(pid) = self.pid else {
            return SystemStats::default();
        };

        let mut stats = SystemStats {
            peak_cpu_usage: self.peak_cpu,
            peak_memory_bytes: self.peak_memory,
            ..SystemStats::default()
        };
        for process in self
            .system
            .processes()
            .values()
            .filter(|p| p.pid() == pid || p.parent() == Some(pid))
        {
            stats.cpu_usage += process.cpu_usage();
            stats.memory_bytes += process.memory();
            stats.process_count += 1;
        }
        stats
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}
