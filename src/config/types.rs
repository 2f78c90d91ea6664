//! Configuration type definitions

use crate::transport::TransportKind;
use crate::types::{ClientCount, WorkerCount};
use serde::{Deserialize, Serialize};

/// Load test settings, every field optional
///
/// The same shape is read from the TOML file and built from command-line
/// flags; [`LoadTestConfig::merge`] layers one over the other and
/// [`LoadTestConfig::into_plan`] fills in defaults and validates.
///
/// ```toml
/// endpoint = "ws://localhost:2567"
/// room = "battle"
/// clients = 500
/// workers = 4
/// delay_ms = 20
/// script = "chatty"
/// transport = "ws"
/// report_interval_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadTestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Room (target) name to join
    #[serde(alias = "target", skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<ClientCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<WorkerCount>,
    /// Delay between the start of consecutive open attempts, in ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_interval_ms: Option<u64>,
}

impl LoadTestConfig {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            endpoint: overrides.endpoint.or(self.endpoint),
            room: overrides.room.or(self.room),
            clients: overrides.clients.or(self.clients),
            workers: overrides.workers.or(self.workers),
            delay_ms: overrides.delay_ms.or(self.delay_ms),
            script: overrides.script.or(self.script),
            transport: overrides.transport.or(self.transport),
            report_interval_ms: overrides.report_interval_ms.or(self.report_interval_ms),
        }
    }
}
