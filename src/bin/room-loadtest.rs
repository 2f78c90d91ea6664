use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use room_loadtest::{
    Args, Command, Coordinator, EventSink, LoadPlan, ProcessLauncher, RunArgs, RuntimeConfig,
    TaskLauncher, WorkerAssignment, WorkerLauncher, logging, resolve_plan,
    formatting::format_bytes,
    runtime::{shutdown_channel, spawn_shutdown_handler},
    tui::{self, LogBuffer, TuiApp},
    worker::process,
};

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Command::Worker { assignment }) => run_worker(&assignment),
        None => run_coordinator(args.run),
    }
}

/// Child side of a process worker: events on stdout, exit 1 on failure
fn run_worker(assignment: &str) -> Result<()> {
    let assignment: WorkerAssignment =
        serde_json::from_str(assignment).context("Invalid worker assignment")?;

    let (sink, events) = EventSink::channel();
    logging::init_worker_logging(sink.clone());

    let rt = RuntimeConfig::worker().build_runtime()?;
    if rt.block_on(process::serve(assignment, sink, events)).is_err() {
        // Already reported on the event stream
        drop(rt);
        std::process::exit(1);
    }
    Ok(())
}

fn run_coordinator(run: RunArgs) -> Result<()> {
    // Configuration errors are fatal before anything starts
    let plan = resolve_plan(run.config.as_deref(), run.overrides())?;

    let (log_buffer, _guard) = logging::init_coordinator_logging(run.no_tui);

    let rt = RuntimeConfig::coordinator().build_runtime()?;
    rt.block_on(run_load_test(plan, run.in_process, log_buffer))
}

async fn run_load_test(plan: LoadPlan, in_process: bool, log_buffer: Option<LogBuffer>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    spawn_shutdown_handler(shutdown_tx.clone());

    let launcher: Arc<dyn WorkerLauncher> = if in_process {
        Arc::new(TaskLauncher::new())
    } else {
        Arc::new(ProcessLauncher::current_exe()?)
    };

    info!(
        endpoint = %plan.endpoint,
        room = %plan.target,
        clients = plan.total_clients.get(),
        workers = plan.worker_count.get(),
        script = %plan.script,
        "Starting load test"
    );
    if plan.overshoot() > 0 {
        warn!(
            "{} clients requested across {} workers; {} sessions will be attempted ({} per worker)",
            plan.total_clients,
            plan.worker_count,
            plan.realized_total(),
            plan.per_worker_share()
        );
    }

    let dashboard = log_buffer.map(|logs| TuiApp::builder(&plan).with_log_buffer(logs).build());
    let report_interval = plan.report_interval;

    let (coordinator, telemetry) = Coordinator::new(plan, launcher);
    let run = tokio::spawn(coordinator.run(shutdown_rx));

    let console = match dashboard {
        Some(app) => {
            if let Err(e) = tui::run_tui(app, telemetry, shutdown_tx.clone()).await {
                error!("Dashboard error: {}", e);
            }
            // However the dashboard ended, the workers stop with it
            let _ = shutdown_tx.send(true);
            None
        }
        None => Some(tokio::spawn(tui::run_headless(telemetry, report_interval))),
    };

    let summary = run.await.context("Coordinator task failed")?;
    if let Some(console) = console {
        let _ = console.await;
    }
    info!(
        started = summary.started,
        failed_to_start = summary.failed_to_start,
        crashed = summary.crashed,
        "All workers stopped after receiving {} and sending {}",
        format_bytes(summary.last_aggregate.run_bytes_received()),
        format_bytes(summary.last_aggregate.run_bytes_sent())
    );
    if summary.crashed > 0 {
        warn!("{} worker(s) crashed during the run", summary.crashed);
    }
    if summary.started == 0 {
        bail!("No worker could be started");
    }

    Ok(())
}
