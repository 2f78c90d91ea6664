//! Configuration module
//!
//! A run is described by a [`LoadTestConfig`]: optional TOML file values,
//! overridden field by field by command-line values, then validated into
//! an immutable [`LoadPlan`](crate::plan::LoadPlan).

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{load_config, resolve_plan};
pub use types::LoadTestConfig;

// Re-export default functions for use in tests and other modules
pub use defaults::{
    DEFAULT_ENDPOINT, DEFAULT_SCRIPT, default_clients, default_endpoint, default_open_delay,
    default_report_interval, default_script, default_workers,
};
