//! Command-line argument parsing
//!
//! Every run flag is optional at the clap level so values from a config
//! file can show through; defaults are applied when the plan is resolved.

use crate::config::LoadTestConfig;
use crate::transport::TransportKind;
use crate::types::{ClientCount, WorkerCount};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Distributed load generator for real-time room servers
#[derive(Parser, Debug)]
#[command(name = "room-loadtest", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a single worker (started by the coordinator, not by hand)
    #[command(hide = true)]
    Worker {
        /// JSON-encoded worker assignment
        #[arg(long)]
        assignment: String,
    },
}

/// Options for a load test run
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// WebSocket endpoint for all connections [default: ws://localhost:2567]
    #[arg(short, long, env = "LOADTEST_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Room name to join
    #[arg(short, long, visible_alias = "target", env = "LOADTEST_ROOM")]
    pub room: Option<String>,

    /// Total number of connections to open [default: 1]
    #[arg(short = 'n', long, alias = "numClients", env = "LOADTEST_CLIENTS")]
    pub clients: Option<ClientCount>,

    /// Worker processes sharing the connections [default: CPU count]
    #[arg(short, long, alias = "threads", env = "LOADTEST_WORKERS")]
    pub workers: Option<WorkerCount>,

    /// Delay before starting each connection, in milliseconds [default: 0]
    #[arg(short, long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Built-in script run by every connection (idle, chatty) [default: idle]
    #[arg(short, long)]
    pub script: Option<String>,

    /// Session transport [default: ws]
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportKind>,

    /// How often workers report stats, in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub report_interval: Option<u64>,

    /// TOML config file; command-line values take precedence
    #[arg(short, long, env = "LOADTEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log progress to stdout instead of showing the dashboard
    #[arg(long)]
    pub no_tui: bool,

    /// Run workers as tasks in this process instead of child processes
    #[arg(long)]
    pub in_process: bool,
}

impl RunArgs {
    /// Command-line values as a config layer
    #[must_use]
    pub fn overrides(&self) -> LoadTestConfig {
        LoadTestConfig {
            endpoint: self.endpoint.clone(),
            room: self.room.clone(),
            clients: self.clients,
            workers: self.workers,
            delay_ms: self.delay,
            script: self.script.clone(),
            transport: self.transport,
            report_interval_ms: self.report_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("room-loadtest").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_flags() {
        let args = parse(&[
            "--room",
            "battle",
            "--clients",
            "50",
            "--workers",
            "2",
            "--delay",
            "10",
            "--transport",
            "memory",
            "--no-tui",
        ]);
        assert!(args.command.is_none());
        let overrides = args.run.overrides();
        assert_eq!(overrides.room.as_deref(), Some("battle"));
        assert_eq!(overrides.clients.map(|c| c.get()), Some(50));
        assert_eq!(overrides.workers.map(|w| w.get()), Some(2));
        assert_eq!(overrides.delay_ms, Some(10));
        assert_eq!(overrides.transport, Some(TransportKind::Memory));
        assert!(args.run.no_tui);
        assert!(!args.run.in_process);
    }

    #[test]
    fn test_target_alias() {
        let args = parse(&["--target", "lobby"]);
        assert_eq!(args.run.room.as_deref(), Some("lobby"));
    }

    #[test]
    fn test_zero_clients_rejected() {
        let result = Args::try_parse_from(["room-loadtest", "--room", "x", "--clients", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unset_flags_leave_gaps() {
        let overrides = parse(&[]).run.overrides();
        assert!(overrides.clients.is_none());
        assert!(overrides.script.is_none());
        assert!(overrides.report_interval_ms.is_none());
    }

    #[test]
    fn test_worker_subcommand() {
        let args = parse(&["worker", "--assignment", "{}"]);
        match args.command {
            Some(Command::Worker { assignment }) => assert_eq!(assignment, "{}"),
            None => panic!("expected worker subcommand"),
        }
    }
}
