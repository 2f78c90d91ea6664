//! Distributed load generator for real-time room servers
//!
//! A coordinator splits a requested number of client sessions across
//! isolated workers. Each worker opens its share through a connection
//! driver, counts the bytes and sessions that pass through its transport,
//! and reports a copy of those counters on a fixed interval. The
//! coordinator merges the latest report from every live worker and
//! publishes the aggregate at a bounded rate.
//!
//! ```no_run
//! use room_loadtest::{Coordinator, TaskLauncher, config::resolve_plan, runtime::shutdown_channel};
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let overrides = room_loadtest::config::LoadTestConfig {
//!     room: Some("battle".to_string()),
//!     ..Default::default()
//! };
//! let plan = resolve_plan(None, overrides)?;
//! let (_stop, shutdown) = shutdown_channel();
//! let (coordinator, _telemetry) = Coordinator::new(plan, Arc::new(TaskLauncher::new()));
//! let summary = coordinator.run(shutdown).await;
//! println!("{} workers started", summary.started);
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod events;
pub mod formatting;
pub mod logging;
pub mod metrics;
pub mod plan;
pub mod rate_limit;
pub mod runtime;
pub mod scripting;
pub mod transport;
pub mod tui;
pub mod types;
pub mod worker;

pub use args::{Args, Command, RunArgs};
pub use config::{LoadTestConfig, load_config, resolve_plan};
pub use coordinator::{Coordinator, RunSummary, Telemetry};
pub use driver::{ConnectionDriver, ConnectionRecord, ConnectionState};
pub use error::ConfigError;
pub use events::{EventSink, Severity, TelemetryEvent, WorkerEvent};
pub use metrics::{AggregateStats, StatsSnapshot, StatsTable, WorkerStats};
pub use plan::{LoadPlan, WorkerAssignment, per_worker_share};
pub use rate_limit::{Debounce, Throttle};
pub use runtime::RuntimeConfig;
pub use scripting::{Scripting, SessionHandle};
pub use transport::{Transport, TransportKind};
pub use worker::{ProcessLauncher, TaskLauncher, WorkerLauncher};
