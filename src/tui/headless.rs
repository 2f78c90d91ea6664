//! Console presentation for `--no-tui` runs
//!
//! Worker diagnostics are logged at their own level as they arrive;
//! aggregate totals at most once per reporting interval, and only when
//! they changed.

use crate::coordinator::Telemetry;
use crate::events::{Severity, TelemetryEvent, WorkerEvent};
use crate::formatting::format_bytes;
use crate::metrics::AggregateStats;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

fn log_event(event: &TelemetryEvent) {
    match &event.event {
        WorkerEvent::SerializerInfo { serializer } => {
            info!(worker = %event.worker, "Joined with serializer {}", serializer);
        }
        WorkerEvent::StatsSnapshot(_) => {}
        other => match other.severity() {
            Some(Severity::Error) => error!("{}", event),
            Some(Severity::Warning) => warn!("{}", event),
            _ => info!("{}", event),
        },
    }
}

fn log_totals(aggregate: &AggregateStats) {
    info!(
        connected = aggregate.clients_connected,
        workers = aggregate.reporting_workers,
        "received {}, sent {}",
        format_bytes(aggregate.run_bytes_received()),
        format_bytes(aggregate.run_bytes_sent())
    );
}

/// Log telemetry until the coordinator finishes
///
/// Returns the final aggregate.
pub async fn run_headless(mut telemetry: Telemetry, interval: Duration) -> AggregateStats {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = telemetry.events.recv() => log_event(&event),
            _ = ticker.tick() => {
                match telemetry.aggregate.has_changed() {
                    Ok(true) => log_totals(&telemetry.aggregate.borrow_and_update()),
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        }
    }

    while let Ok(event) = telemetry.events.try_recv() {
        log_event(&event);
    }
    let last = *telemetry.aggregate.borrow();
    info!("Run finished");
    log_totals(&last);
    last
}
