//! Dashboard rendering

use super::app::TuiApp;
use super::constants::{colors, layout};
use super::log_capture::LogLine;
use crate::events::Severity;
use crate::formatting::{format_bytes, format_elapsed};
use ratatui::{
    Frame,
    layout::{Alignment, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Render the whole dashboard
pub fn render_ui(f: &mut Frame, app: &TuiApp) {
    if app.is_log_fullscreen() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(layout::fullscreen_log_sections())
            .split(f.area());
        render_header(f, chunks[0], app);
        render_logs(f, chunks[1], app);
        render_footer(f, chunks[2]);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(layout::main_sections())
        .split(f.area());

    render_header(f, chunks[0], app);
    render_stats(f, chunks[1], app);
    render_logs(f, chunks[2], app);
    render_footer(f, chunks[3]);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(text.to_string(), Style::default().fg(colors::LABEL))
}

fn value(text: String, color: ratatui::style::Color) -> Span<'static> {
    Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn boxed(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(colors::VALUE))
}

/// Endpoint, target, serializer and elapsed time
fn render_header(f: &mut Frame, area: Rect, app: &TuiApp) {
    let status = if app.is_finished() {
        value("finished".to_string(), colors::LABEL)
    } else {
        value("running".to_string(), colors::CONNECTED)
    };

    let lines = vec![
        Line::from(vec![
            label("Endpoint: "),
            value(app.endpoint().to_string(), colors::VALUE),
            label("  Room: "),
            value(app.target().to_string(), colors::VALUE),
            label("  Serializer: "),
            value(app.serializer().unwrap_or("...").to_string(), colors::VALUE),
        ]),
        Line::from(vec![
            label("Elapsed: "),
            value(format_elapsed(app.elapsed()), colors::VALUE),
            label("  Workers: "),
            value(app.worker_count().to_string(), colors::VALUE),
            label("  Status: "),
            status,
        ]),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " room-loadtest ",
                Style::default().fg(colors::TITLE).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(colors::TITLE)),
    );
    f.render_widget(header, area);
}

fn render_stats(f: &mut Frame, area: Rect, app: &TuiApp) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(layout::stats_columns())
        .split(area);

    render_clients(f, columns[0], app);
    render_processing(f, columns[1], app);
    render_networking(f, columns[2], app);
}

fn render_clients(f: &mut Frame, area: Rect, app: &TuiApp) {
    let aggregate = app.aggregate();
    let requested = if app.realized_clients() == app.requested_clients() {
        app.requested_clients().to_string()
    } else {
        format!("{} ({} opened)", app.requested_clients(), app.realized_clients())
    };

    let lines = vec![
        Line::from(vec![label("Requested: "), value(requested, colors::VALUE)]),
        Line::from(vec![
            label("Connected: "),
            value(aggregate.clients_connected.to_string(), colors::CONNECTED),
        ]),
        Line::from(vec![
            label("Failed:    "),
            value(app.failed().to_string(), colors::FAILED),
        ]),
        Line::from(vec![
            label("Reporting: "),
            value(
                format!("{}/{} workers", aggregate.reporting_workers, app.worker_count()),
                colors::VALUE,
            ),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(boxed("Clients")), area);
}

fn render_processing(f: &mut Frame, area: Rect, app: &TuiApp) {
    let system = app.system();
    let lines = vec![
        Line::from(vec![
            label("Memory: "),
            value(format_bytes(system.memory_bytes), colors::MEMORY),
            label(" (peak "),
            value(format_bytes(system.peak_memory_bytes), colors::MEMORY),
            label(")"),
        ]),
        Line::from(vec![
            label("CPU:    "),
            value(format!("{:.1}%", system.cpu_usage), colors::CPU),
            label(" (peak "),
            value(format!("{:.1}%", system.peak_cpu_usage), colors::CPU),
            label(")"),
        ]),
        Line::from(vec![
            label("Procs:  "),
            value(system.process_count.to_string(), colors::VALUE),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(boxed("Processing")), area);
}

fn render_networking(f: &mut Frame, area: Rect, app: &TuiApp) {
    let aggregate = app.aggregate();
    let lines = vec![
        Line::from(vec![
            label("↓ Received: "),
            value(format_bytes(aggregate.run_bytes_received()), colors::RECEIVED),
        ]),
        Line::from(vec![
            label("↑ Sent:     "),
            value(format_bytes(aggregate.run_bytes_sent()), colors::SENT),
        ]),
        Line::from(vec![
            label("  Total:    "),
            value(format_bytes(aggregate.total_bytes()), colors::VALUE),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(boxed("Networking")), area);
}

pub(super) fn severity_color(severity: Severity) -> ratatui::style::Color {
    match severity {
        Severity::Info => colors::INFO,
        Severity::Warning => colors::WARNING,
        Severity::Error => colors::ERROR,
    }
}

fn log_line(line: LogLine) -> Line<'static> {
    Line::from(Span::styled(
        line.text,
        Style::default().fg(severity_color(line.severity)),
    ))
}

fn render_logs(f: &mut Frame, area: Rect, app: &TuiApp) {
    // Borders take two rows
    let visible = usize::from(area.height.saturating_sub(2));
    let lines: Vec<Line> = app
        .logs()
        .recent_lines(visible)
        .into_iter()
        .map(log_line)
        .collect();

    let title = format!("Logs ({})", app.logs().len());
    f.render_widget(Paragraph::new(lines).block(boxed(&title)), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| {
        Span::styled(
            k,
            Style::default().fg(colors::TITLE).add_modifier(Modifier::BOLD),
        )
    };
    let footer = Paragraph::new(Line::from(vec![
        label("Press "),
        key("q"),
        label(", "),
        key("Esc"),
        label(" or "),
        key("Ctrl+C"),
        label(" to stop the test  |  "),
        key("l"),
        label(" toggles full-screen logs"),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::LABEL)),
    )
    .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{TelemetryEvent, WorkerEvent};
    use crate::metrics::AggregateStats;
    use crate::tui::app::tests::test_plan;
    use crate::types::WorkerId;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(app: &TuiApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render_ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_renders_plan_and_totals() {
        let mut app = TuiApp::builder(&test_plan()).without_system_monitor().build();
        app.apply_aggregate(AggregateStats {
            bytes_received: 2048,
            bytes_sent: 512,
            clients_connected: 9,
            reporting_workers: 3,
            ..AggregateStats::default()
        });
        app.apply_event(&TelemetryEvent {
            worker: WorkerId::from_index(0),
            event: WorkerEvent::SerializerInfo {
                serializer: "schema".to_string(),
            },
        });

        let text = screen(&app);
        assert!(text.contains("battle"));
        assert!(text.contains("schema"));
        assert!(text.contains("10 (12 opened)"));
        assert!(text.contains("Connected: 9"));
        assert!(text.contains(&format_bytes(2048)));
        assert!(text.contains(&format_bytes(512)));
        assert!(text.contains("3/3 workers"));
    }

    #[test]
    fn test_finished_view_keeps_traffic_of_exited_workers() {
        let mut app = TuiApp::builder(&test_plan()).without_system_monitor().build();
        app.apply_aggregate(AggregateStats {
            retired_bytes_received: 4096,
            retired_bytes_sent: 1024,
            ..AggregateStats::default()
        });
        app.mark_finished();

        let text = screen(&app);
        assert!(text.contains("finished"));
        assert!(text.contains("Connected: 0"));
        assert!(text.contains(&format_bytes(4096)));
        assert!(text.contains(&format_bytes(1024)));
        assert!(text.contains(&format_bytes(5120)));
    }

    #[test]
    fn test_renders_log_lines() {
        let mut app = TuiApp::builder(&test_plan()).without_system_monitor().build();
        app.apply_event(&TelemetryEvent {
            worker: WorkerId::from_index(1),
            event: WorkerEvent::connection_error(4, "refused"),
        });
        let text = screen(&app);
        assert!(text.contains("[worker-1] client #4: refused"));
        assert!(text.contains("Failed:    1"));
    }

    #[test]
    fn test_fullscreen_logs_hide_stats() {
        let mut app = TuiApp::builder(&test_plan()).without_system_monitor().build();
        app.toggle_log_fullscreen();
        let text = screen(&app);
        assert!(!text.contains("Networking"));
        assert!(text.contains("Logs (0)"));
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(severity_color(Severity::Error), colors::ERROR);
        assert_eq!(severity_color(Severity::Warning), colors::WARNING);
        assert_eq!(severity_color(Severity::Info), colors::INFO);
    }
}
