//! Terminal dashboard for a running load test
//!
//! Reads the coordinator's [`Telemetry`] and redraws at most once per
//! [`constants::REDRAW_INTERVAL`]. Quitting from the keyboard requests
//! global shutdown.

mod app;
mod constants;
mod headless;
pub mod log_capture;
pub mod system_stats;
mod ui;

pub use app::{TuiApp, TuiAppBuilder};
pub use constants::REDRAW_INTERVAL;
pub use headless::run_headless;
pub use log_capture::{LogBuffer, LogLine, LogMakeWriter};
pub use ui::render_ui;

use crate::coordinator::Telemetry;
use crate::rate_limit::Throttle;
use crate::runtime::shutdown_requested;
use anyhow::Result;
use constants::{INPUT_POLL_INTERVAL, SYSTEM_SAMPLE_INTERVAL};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;

/// Setup the terminal for TUI rendering
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Restore the terminal to its original state
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    // Clear first so escape sequences don't leak to the shell
    terminal.clear()?;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    ToggleLogs,
    Ignore,
}

fn key_action(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('l') => KeyAction::ToggleLogs,
        _ => KeyAction::Ignore,
    }
}

/// Run the dashboard until the user quits or shutdown is requested
///
/// Takes over the terminal. Quitting with `q`, `Esc` or Ctrl-C flips the
/// shutdown flag so the coordinator stops its workers. The dashboard stays
/// up after the run finishes so the final numbers can be read.
pub async fn run_tui(
    mut app: TuiApp,
    telemetry: Telemetry,
    shutdown_tx: watch::Sender<bool>,
) -> Result<()> {
    let mut terminal = setup_terminal()?;

    // Restore the terminal even if something panics while it is raw
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let shutdown_rx = shutdown_tx.subscribe();
    let result = run_app(&mut terminal, &mut app, telemetry, shutdown_rx).await;

    restore_terminal(&mut terminal)?;

    let _ = shutdown_tx.send(true);

    result
}

/// Dashboard event loop
async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut TuiApp,
    mut telemetry: Telemetry,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let redraw_ready = Arc::new(Notify::new());
    let redraw = {
        let ready = redraw_ready.clone();
        Throttle::new(REDRAW_INTERVAL, move |()| ready.notify_one())
    };

    let mut input = tokio::time::interval(INPUT_POLL_INTERVAL);
    input.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sampling = tokio::time::interval(SYSTEM_SAMPLE_INTERVAL);
    sampling.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut aggregate_open = true;

    loop {
        tokio::select! {
            _ = shutdown_requested(&mut shutdown_rx) => break,
            _ = redraw_ready.notified() => {
                terminal.draw(|f| ui::render_ui(f, app))?;
            }
            Some(event) = telemetry.events.recv() => {
                app.apply_event(&event);
                let _ = redraw.call(());
            }
            changed = telemetry.aggregate.changed(), if aggregate_open => {
                if changed.is_ok() {
                    app.apply_aggregate(*telemetry.aggregate.borrow_and_update());
                } else {
                    // Coordinator dropped its sender: every worker is gone
                    aggregate_open = false;
                    app.mark_finished();
                }
                let _ = redraw.call(());
            }
            _ = sampling.tick() => {
                app.refresh_system();
                let _ = redraw.call(());
            }
            _ = input.tick() => {
                if event::poll(Duration::from_millis(0))?
                    && let Event::Key(key) = event::read()?
                    && key.kind == KeyEventKind::Press
                {
                    match key_action(key.code, key.modifiers) {
                        KeyAction::Quit => break,
                        KeyAction::ToggleLogs => {
                            app.toggle_log_fullscreen();
                            let _ = redraw.call(());
                        }
                        KeyAction::Ignore => {}
                    }
                }
            }
        }
    }

    Ok(())
}
