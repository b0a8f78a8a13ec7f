//! Full-screen terminal renderer (`ratatui` on `crossterm`).

use std::io::{Stdout, stdout};

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::StreamExt;
use httpmon_core::pipeline::PipelineControl;
use httpmon_log_pipeline::{AlertSnapshot, StatsSnapshot, TransitionKind};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tokio::time::MissedTickBehavior;

use super::{Renderer, SnapshotSources, ViewSettings, view};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Draws the latest snapshots every refresh period.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for TerminalRenderer {
    async fn run(&mut self, sources: SnapshotSources, control: PipelineControl) -> Result<()> {
        let mut terminal = match init() {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = restore();
                return Err(e);
            }
        };

        let result = draw_loop(&mut terminal, &sources, &control).await;

        // restore even when the loop failed
        let restored = restore();
        result.and(restored)
    }
}

fn init() -> Result<Tui> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

fn restore() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

async fn draw_loop(
    terminal: &mut Tui,
    sources: &SnapshotSources,
    control: &PipelineControl,
) -> Result<()> {
    let mut tick = tokio::time::interval(sources.settings.refresh_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut events = EventStream::new();

    loop {
        tokio::select! {
            _ = control.signaled() => break,

            _ = tick.tick() => {
                let alert = sources.alert.load();
                let stats = sources.stats.load();
                terminal.draw(|f| ui(f, &sources.settings, &alert, &stats))?;
            }

            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if is_quit(&key) => {
                    tracing::info!("quit requested from terminal");
                    control.signal();
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(anyhow::anyhow!("terminal input failed: {}", e));
                }
                None => {
                    tracing::debug!("terminal input stream ended");
                    control.signal();
                    break;
                }
            }
        }
    }

    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Lays out the whole screen.
pub fn ui(f: &mut Frame, settings: &ViewSettings, alert: &AlertSnapshot, stats: &StatsSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_title(f, rows[0]);
    render_stats_pane(f, body[0], settings, stats);
    render_alert_pane(f, body[1], alert);
    render_settings(f, rows[2], settings);
}

fn render_title(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        view::TITLE,
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn render_stats_pane(f: &mut Frame, area: Rect, settings: &ViewSettings, stats: &StatsSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Traffic")
        .border_style(Style::default().fg(Color::Blue));

    let mut lines: Vec<Line> = view::totals_lines(stats).into_iter().map(Line::from).collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        view::interval_heading(settings),
        Style::default().add_modifier(Modifier::UNDERLINED),
    )));

    match &stats.last_interval {
        None => lines.push(Line::from(view::WAITING_FOR_INTERVAL)),
        Some(interval) if interval.is_empty() => lines.push(Line::from("No traffic")),
        Some(interval) => {
            lines.push(Line::from("Status codes:"));
            lines.extend(
                view::status_lines(interval)
                    .into_iter()
                    .map(|l| Line::from(format!("  {l}"))),
            );
            lines.push(Line::default());
            lines.push(Line::from(format!("Top {} sections:", settings.top_sections)));
            lines.extend(
                view::section_lines(interval, settings.top_sections)
                    .into_iter()
                    .map(|l| Line::from(format!("  {l}"))),
            );
        }
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_alert_pane(f: &mut Frame, area: Rect, alert: &AlertSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Alerts")
        .border_style(Style::default().fg(Color::Magenta));

    let mut lines = vec![Line::from(view::alert_headline(alert)), Line::default()];
    if let Some(transition) = &alert.last_transition {
        let color = match transition.kind {
            TransitionKind::Alert => Color::Red,
            TransitionKind::Recovered => Color::Green,
        };
        lines.push(Line::from(Span::styled(
            view::transition_label(transition.kind),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            transition.message.as_str(),
            Style::default().fg(color),
        )));
    }

    let text = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(text, area);
}

fn render_settings(f: &mut Frame, area: Rect, settings: &ViewSettings) {
    let text = Paragraph::new(view::settings_line(settings))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(text, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpmon_log_pipeline::{AlertTransition, IntervalStats};
    use ratatui::backend::TestBackend;

    fn settings() -> ViewSettings {
        ViewSettings {
            log_file_path: "/tmp/access.log".to_owned(),
            threshold_hits_per_sec: 10,
            window_secs: 120,
            stats_interval_secs: 10,
            top_sections: 2,
            refresh_interval: Duration::from_millis(250),
        }
    }

    fn render(alert: &AlertSnapshot, stats: &StatsSnapshot) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(140, 24)).unwrap();
        terminal
            .draw(|f| ui(f, &settings(), alert, stats))
            .unwrap();
        terminal
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn find(terminal: &Terminal<TestBackend>, needle: &str) -> Option<(u16, u16)> {
        screen_text(terminal)
            .lines()
            .enumerate()
            .find_map(|(y, row)| {
                row.find(needle)
                    .map(|byte| (row[..byte].chars().count() as u16, y as u16))
            })
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&key(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn key_release_is_not_quit() {
        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit(&release));
    }

    #[test]
    fn initial_screen_waits_for_data() {
        let terminal = render(&AlertSnapshot::default(), &StatsSnapshot::default());
        let text = screen_text(&terminal);
        assert!(text.contains(view::TITLE));
        assert!(text.contains("Total hits: 0"));
        assert!(text.contains(view::WAITING_FOR_INTERVAL));
        assert!(text.contains("There have been 0 alerts since monitoring started"));
        assert!(text.contains("Following /tmp/access.log"));
    }

    #[test]
    fn interval_and_alert_are_shown() {
        let mut interval = IntervalStats {
            hits: 3,
            bytes: 30,
            duration_secs: 10,
            ..IntervalStats::default()
        };
        interval.section_counts.insert("api".to_owned(), 3);
        interval.section_bytes.insert("api".to_owned(), 30);
        interval
            .status_class_counts
            .insert(httpmon_core::event::StatusClass::ClientError, 3);
        let stats = StatsSnapshot {
            total_hits: 3,
            total_bytes: 30,
            intervals_completed: 1,
            last_interval: Some(interval),
        };
        let alert = AlertSnapshot {
            alert_count: 1,
            is_alerted: true,
            window_hits: 1_300,
            last_transition: Some(AlertTransition {
                kind: TransitionKind::Alert,
                hits: 1_300,
                timestamp: 1_549_573_860,
                message: "High traffic generated an alert - hits = 1300, triggered at 2019-02-07 21:11:00".to_owned(),
            }),
        };

        let terminal = render(&alert, &stats);
        let text = screen_text(&terminal);
        assert!(text.contains("4XX: 3"));
        assert!(text.contains("/api  hits: 3  bytes: 30"));
        assert!(text.contains("There has been 1 alert since monitoring started"));

        let (x, y) = find(&terminal, "ALERT").unwrap();
        let cell = &terminal.backend().buffer()[(x, y)];
        assert_eq!(cell.fg, Color::Red);
    }

    #[test]
    fn recovery_is_green() {
        let alert = AlertSnapshot {
            alert_count: 1,
            is_alerted: false,
            window_hits: 6,
            last_transition: Some(AlertTransition {
                kind: TransitionKind::Recovered,
                hits: 6,
                timestamp: 1_549_573_868,
                message: "Traffic normalized - hits = 6, recovered at 2019-02-07 21:11:08".to_owned(),
            }),
        };
        let terminal = render(&alert, &StatsSnapshot::default());
        let (x, y) = find(&terminal, "RECOVERED").unwrap();
        assert_eq!(terminal.backend().buffer()[(x, y)].fg, Color::Green);
    }
}
