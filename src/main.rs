use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap};

use pbp_terminal::chart::{self, ChartKind, ChartSpec};
use pbp_terminal::config::DashboardConfig;
use pbp_terminal::dashboard::{DashboardState, Delta, PanelState, RangeBound, apply_delta};
use pbp_terminal::export::{self, PanelSheet};
use pbp_terminal::loader::{self, PlaySource, SeasonLoader};
use pbp_terminal::panels::PanelKind;
use pbp_terminal::play::Season;

const MIN_SEASON: Season = 1999;

struct App {
    state: DashboardState,
    loader: SeasonLoader<Box<dyn PlaySource>>,
    config: DashboardConfig,
    pending_season: Option<Season>,
    should_quit: bool,
}

impl App {
    fn new(config: DashboardConfig) -> Self {
        let source = loader::source_from_config(&config);
        let state = DashboardState::new(config.season, source.describe());
        Self {
            state,
            loader: SeasonLoader::new(source),
            pending_season: Some(config.season),
            config,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            } else if key.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char(c @ '1'..='5') => {
                self.state.select_panel(c as usize - '1' as usize);
            }
            KeyCode::Tab => self.state.next_panel(),
            KeyCode::BackTab => self.state.prev_panel(),
            KeyCode::Char('h') | KeyCode::Left => self.state.focus_prev_dim(),
            KeyCode::Char('l') | KeyCode::Right => self.state.focus_next_dim(),
            KeyCode::Char('j') | KeyCode::Down => self.state.cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.state.cursor_up(),
            KeyCode::Char(' ') => {
                self.state.toggle_at_cursor();
            }
            KeyCode::Char('a') => {
                self.state.select_all_focused();
            }
            KeyCode::Char('n') => {
                self.state.select_none_focused();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.state.shift_quarter(1);
            }
            KeyCode::Char('-') => {
                self.state.shift_quarter(-1);
            }
            KeyCode::Char('r') => {
                if self.state.reset_panel() {
                    self.state.push_log("[INFO] Panel reset to defaults");
                }
            }
            KeyCode::Char('g') | KeyCode::Enter => self.state.generate(),
            KeyCode::Char('x') => self.export(),
            KeyCode::Char(',') => self.request_season(self.state.season.saturating_sub(1)),
            KeyCode::Char('.') => self.request_season(self.state.season.saturating_add(1)),
            _ => {}
        }
    }

    fn request_season(&mut self, season: Season) {
        if season < MIN_SEASON {
            self.state
                .push_log(format!("[WARN] No play-by-play data before {MIN_SEASON}"));
            return;
        }
        self.pending_season = Some(season);
    }

    /// Blocking: download, clean, project and aggregate one season.
    fn load_pending(&mut self) -> Option<Delta> {
        let season = self.pending_season.take()?;
        let delta = match loader::load_season(&self.loader, season, self.config.domain_order) {
            Ok(data) => Delta::SeasonLoaded {
                engine: data.engine,
                report: data.report,
            },
            Err(err) => Delta::SeasonFailed {
                season,
                error: err.to_string(),
            },
        };
        Some(delta)
    }

    fn export(&mut self) {
        if self.state.panels.is_empty() {
            self.state.push_log("[WARN] Nothing to export");
            return;
        }
        let path = export::default_export_path(self.state.season);
        let sheets: Vec<PanelSheet<'_>> = self
            .state
            .panels
            .iter()
            .map(|panel| PanelSheet {
                kind: panel.kind,
                aggregate: &panel.aggregate,
            })
            .collect();
        let delta = match export::export_panels(
            &path,
            self.state.season,
            self.state.report.as_ref(),
            &sheets,
        ) {
            Ok(report) => Delta::ExportFinished {
                path: report.path.display().to_string(),
                sheets: report.sheets,
                rows: report.rows,
            },
            Err(err) => Delta::ExportFailed(format!("{err:#}")),
        };
        apply_delta(&mut self.state, delta);
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    // stderr shares the terminal with the alternate screen; stay quiet unless asked.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let config = DashboardConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        if let Some(season) = app.pending_season {
            apply_delta(&mut app.state, Delta::SeasonLoading(season));
            terminal.draw(|f| ui(f, app))?;
            if let Some(delta) = app.load_pending() {
                apply_delta(&mut app.state, delta);
            }
        }

        app.state.maybe_clear_export(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    frame.render_widget(Paragraph::new(panel_tabs(&app.state)), chunks[1]);

    render_body(frame, chunks[2], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[3]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[4]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &DashboardState) -> String {
    let status = match (state.loading, &state.load_error) {
        (Some(season), _) => format!("loading {season}..."),
        (None, Some(_)) => "load failed".to_string(),
        (None, None) => state
            .engine
            .as_ref()
            .map(|e| format!("{} plays", e.plays().len()))
            .unwrap_or_default(),
    };
    format!(
        "NFL PLAY BY PLAY | Season {} | {} | {}",
        state.season, state.source_label, status
    )
}

fn panel_tabs(state: &DashboardState) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, kind) in PanelKind::ALL.iter().enumerate() {
        let style = if idx == state.active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} {} ", idx + 1, kind.short_label()), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn footer_text(state: &DashboardState) -> String {
    if state.export.active {
        return state.export.message.clone();
    }
    "1-5/Tab Panel | h/l Filter | j/k Move | Space Toggle | a/n All/None | +/- Quarter | g Generate | r Reset | x Export | ,/. Season | ? Help | q Quit".to_string()
}

fn render_body(frame: &mut Frame, area: Rect, state: &DashboardState) {
    if let Some(err) = &state.load_error {
        let msg = Paragraph::new(format!(
            "Season {} could not be loaded.\n\n{err}\n\nPress , or . to try another season.",
            state.season
        ))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Red))
        .block(Block::default().title("Data source error").borders(Borders::ALL));
        frame.render_widget(msg, area);
        return;
    }
    let Some(panel) = state.active_panel() else {
        let msg = Paragraph::new("Loading play-by-play data...")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(msg, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(30)])
        .split(area);

    let filters = Paragraph::new(filter_lines(state, panel))
        .block(Block::default().title("Filters").borders(Borders::ALL));
    frame.render_widget(filters, columns[0]);

    render_chart(frame, columns[1], state.season, panel);
}

fn filter_lines(state: &DashboardState, panel: &PanelState) -> Vec<Line<'static>> {
    let Some(domains) = state.domains() else {
        return Vec::new();
    };
    let focused = panel.focused_dim();
    let mut lines = Vec::new();

    for dim in panel.kind.dimensions() {
        let is_focused = *dim == focused;
        let title_style = if is_focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        if dim.is_range() {
            let Some(range) = panel.quarter_range() else {
                continue;
            };
            let mark = |bound: RangeBound, value: u8| {
                if is_focused && panel.bound == bound {
                    format!("[{value}]")
                } else {
                    value.to_string()
                }
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", dim.label()), title_style),
                Span::raw(format!(
                    "{} - {}",
                    mark(RangeBound::Low, range.low),
                    mark(RangeBound::High, range.high)
                )),
            ]));
            continue;
        }

        let labels = domains.labels(*dim);
        let chosen = panel.selection.selected_len(*dim).unwrap_or(0);
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", dim.label()), title_style),
            Span::raw(format!("{chosen}/{}", labels.len())),
        ]));
        if !is_focused {
            continue;
        }

        let (start, end) = visible_range(panel.cursor, labels.len(), 8);
        for idx in start..end {
            let check = if panel.selection.is_selected(domains, *dim, idx) {
                "[x]"
            } else {
                "[ ]"
            };
            let style = if idx == panel.cursor {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("  {check} {}", labels[idx]),
                style,
            )));
        }
    }
    lines
}

fn render_chart(frame: &mut Frame, area: Rect, season: Season, panel: &PanelState) {
    let Some(spec) = panel.chart.as_ref() else {
        let block = Block::default()
            .title(format!("{} ({season})", panel.kind.title()))
            .borders(Borders::ALL);
        let text = format!(
            "{}\n\n{} rows, {} plays match the current filters. Press g to generate.",
            chart::PLACEHOLDER,
            panel.aggregate.len(),
            panel.aggregate.total_plays()
        );
        let msg = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(msg, area);
        return;
    };

    let block = Block::default()
        .title(spec.title.clone())
        .borders(Borders::ALL);
    if spec.is_empty() {
        let msg = Paragraph::new(chart::NO_DATA)
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }

    match &spec.kind {
        ChartKind::Scatter { .. } => render_scatter(frame, area, spec, block),
        ChartKind::GroupedBar | ChartKind::Bar => render_bars(frame, area, spec, block),
    }
}

fn render_scatter(frame: &mut Frame, area: Rect, spec: &ChartSpec, block: Block<'_>) {
    let coords: Vec<(f64, f64)> = spec.points.iter().map(|p| (p.x, p.y)).collect();
    let min = spec
        .points
        .iter()
        .map(|p| p.x.min(p.y))
        .fold(f64::INFINITY, f64::min);
    let max = spec.max_value();
    let pad = ((max - min) * 0.08).max(1.0);
    let lo = (min - pad).max(0.0);
    let hi = max + pad;

    let canvas = Canvas::default()
        .block(block.title_bottom(format!("x = {}, y = {}", spec.x, spec.y)))
        .x_bounds([lo, hi])
        .y_bounds([lo, hi])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Cyan,
            });
            for point in &spec.points {
                ctx.print(
                    point.x,
                    point.y,
                    Span::styled(point.label.clone(), Style::default().fg(Color::White)),
                );
            }
        });
    frame.render_widget(canvas, area);
}

fn render_bars(frame: &mut Frame, area: Rect, spec: &ChartSpec, block: Block<'_>) {
    let mut chart = BarChart::default()
        .block(block)
        .bar_width(5)
        .bar_gap(1)
        .group_gap(3);

    match spec.kind {
        ChartKind::GroupedBar => {
            for (cat_idx, category) in spec.categories.iter().enumerate() {
                let bars: Vec<Bar<'static>> = spec
                    .series
                    .iter()
                    .filter_map(|series| {
                        let value = series.values.get(cat_idx).copied().flatten()?;
                        Some(
                            Bar::default()
                                .value(value)
                                .label(Line::from(series.name.clone()))
                                .style(Style::default().fg(series_color(&series.name))),
                        )
                    })
                    .collect();
                chart = chart.data(
                    BarGroup::default()
                        .label(Line::from(category.clone()))
                        .bars(&bars),
                );
            }
        }
        _ => {
            let values = spec.series.first().map(|s| s.values.as_slice()).unwrap_or(&[]);
            let bars: Vec<Bar<'static>> = spec
                .categories
                .iter()
                .zip(values)
                .map(|(category, value)| {
                    Bar::default()
                        .value(value.unwrap_or(0))
                        .label(Line::from(category.clone()))
                        .style(Style::default().fg(Color::Green))
                })
                .collect();
            chart = chart.bar_width(9).data(BarGroup::default().bars(&bars));
        }
    }
    frame.render_widget(chart, area);
}

fn series_color(name: &str) -> Color {
    match name {
        "pass" => Color::Cyan,
        "run" => Color::Green,
        _ => Color::Yellow,
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &DashboardState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "NFL Play by Play - Help",
        "",
        "Panels:",
        "  1-5 / Tab    Switch panel",
        "  g / Enter    Generate chart",
        "  r            Reset panel filters",
        "",
        "Filters:",
        "  h/l or ←/→   Previous/next filter",
        "  j/k or ↑/↓   Move cursor (quarter: pick bound)",
        "  Space        Toggle value",
        "  a / n        Select all / none",
        "  + / -        Move quarter bound",
        "",
        "Data:",
        "  , / .        Previous/next season",
        "  x            Export panels to xlsx",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
