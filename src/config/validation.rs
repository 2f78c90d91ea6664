//! Configuration validation
//!
//! Turns a merged [`LoadTestConfig`] into a [`LoadPlan`], filling in
//! defaults. Counts are already non-zero by type; this checks the rest.

use super::defaults;
use super::types::LoadTestConfig;
use crate::error::ConfigError;
use crate::plan::LoadPlan;
use crate::scripting::BUILTIN_SCRIPTS;
use crate::types::{Endpoint, TargetName};
use std::time::Duration;

impl LoadTestConfig {
    /// Validate and resolve into an immutable plan
    ///
    /// # Errors
    /// - [`ConfigError::MissingTarget`] if no room name is set
    /// - [`ConfigError::InvalidEndpoint`] unless the endpoint is a ws/wss URL
    /// - [`ConfigError::UnknownScript`] for a script that is not built in
    /// - [`ConfigError::ZeroReportInterval`] for a zero reporting interval
    pub fn into_plan(self) -> Result<LoadPlan, ConfigError> {
        let target = self
            .room
            .and_then(|room| TargetName::new(room.trim().to_string()).ok())
            .ok_or(ConfigError::MissingTarget)?;

        let endpoint_str = self.endpoint.unwrap_or_else(defaults::default_endpoint);
        let endpoint = Endpoint::new(endpoint_str.clone()).map_err(|_| {
            ConfigError::InvalidEndpoint {
                endpoint: endpoint_str,
            }
        })?;

        let script = self.script.unwrap_or_else(defaults::default_script);
        if !BUILTIN_SCRIPTS.contains(&script.as_str()) {
            return Err(ConfigError::UnknownScript {
                name: script,
                available: BUILTIN_SCRIPTS.join(", "),
            });
        }

        let report_interval = match self.report_interval_ms {
            Some(0) => return Err(ConfigError::ZeroReportInterval),
            Some(ms) => Duration::from_millis(ms),
            None => defaults::default_report_interval(),
        };

        Ok(LoadPlan {
            endpoint,
            target,
            total_clients: self.clients.unwrap_or_else(defaults::default_clients),
            worker_count: self.workers.unwrap_or_else(defaults::default_workers),
            open_delay: self
                .delay_ms
                .map_or_else(defaults::default_open_delay, Duration::from_millis),
            report_interval,
            script,
            transport: self.transport.unwrap_or_default(),
        })
    }
}
