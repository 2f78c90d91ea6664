//! Default values for configuration fields

use crate::plan::DEFAULT_REPORT_INTERVAL;
use crate::types::{ClientCount, WorkerCount};
use std::time::Duration;

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:2567";

/// Script used when none is configured
pub const DEFAULT_SCRIPT: &str = "idle";

#[inline]
pub fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// One client
#[inline]
pub fn default_clients() -> ClientCount {
    ClientCount::ONE
}

/// One worker per CPU core
#[inline]
pub fn default_workers() -> WorkerCount {
    WorkerCount::available_parallelism()
}

/// No pacing between open attempts
#[inline]
pub fn default_open_delay() -> Duration {
    Duration::ZERO
}

#[inline]
pub fn default_report_interval() -> Duration {
    DEFAULT_REPORT_INTERVAL
}

#[inline]
pub fn default_script() -> String {
    DEFAULT_SCRIPT.to_string()
}
