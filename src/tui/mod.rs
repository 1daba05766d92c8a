//! Ratatui-based terminal UI.
//!
//! An interactive shading editor: pick a cell, dim or brighten it, and watch the
//! string's operating point, bypass states and I–V / P–V curve update.
//!
//! A day sweep of the current shading can run on a worker thread; the UI stays
//! responsive and `Esc` cancels it, leaving the partial result in the status line.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::data::{DayConfig, DayReport, ShadingPattern, apply_pattern, run_day};
use crate::domain::{PresetTable, Scenario, SweepOptions};
use crate::error::AppError;
use crate::plot::PlotKind;
use crate::sim::{StringEvaluation, evaluate_scenario, total_ideal_power, total_power};

mod plotters_chart;

use plotters_chart::CurvePlottersChart;

const IRRADIANCE_STEP: f64 = 0.1;
const RANDOM_SEVERITY: f64 = 0.9;

/// Start the TUI on `scenario`.
pub fn run(scenario: Scenario, presets: &PresetTable, opts: SweepOptions) -> Result<(), AppError> {
    let mut app = App::new(scenario, presets, opts)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Restores the terminal (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Day sweep running on a worker thread.
struct DayJob {
    cancel: Arc<AtomicBool>,
    rx: Receiver<Result<DayReport, AppError>>,
}

struct App {
    scenario: Scenario,
    presets: PresetTable,
    opts: SweepOptions,
    evals: Vec<StringEvaluation>,
    string_idx: usize,
    /// Position of the selected cell within the selected string.
    cell_pos: usize,
    plot: PlotKind,
    seed: u64,
    status: String,
    day_config: DayConfig,
    day: Option<DayJob>,
}

impl App {
    fn new(scenario: Scenario, presets: &PresetTable, opts: SweepOptions) -> Result<Self, AppError> {
        let presets = scenario.preset_table(presets);
        scenario.validate(&presets)?;
        if scenario.strings.is_empty() {
            return Err(AppError::new(3, "Scenario has no strings to show."));
        }
        let mut app = Self {
            scenario,
            presets,
            opts,
            evals: Vec::new(),
            string_idx: 0,
            cell_pos: 0,
            plot: PlotKind::Iv,
            seed: 0,
            status: "Ready.".to_string(),
            day_config: DayConfig::new(Local::now().date_naive()),
            day: None,
        };
        app.reevaluate();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if self.poll_day() {
                needs_redraw = true;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Esc if self.day.is_some() => self.cancel_day(),
            KeyCode::Char('q') | KeyCode::Esc => {
                self.cancel_day();
                return Ok(true);
            }
            KeyCode::Char('y') => self.start_day(),
            KeyCode::Up => self.cell_pos = self.cell_pos.saturating_sub(1),
            KeyCode::Down => {
                let n = self.current_layout_len();
                if self.cell_pos + 1 < n {
                    self.cell_pos += 1;
                }
            }
            KeyCode::Left => self.adjust_irradiance(-IRRADIANCE_STEP),
            KeyCode::Right => self.adjust_irradiance(IRRADIANCE_STEP),
            KeyCode::Char('s') => {
                self.string_idx = (self.string_idx + 1) % self.scenario.strings.len();
                self.cell_pos = 0;
                self.status = format!("string: {}", self.scenario.strings[self.string_idx].name);
            }
            KeyCode::Char('p') => {
                self.plot = self.plot.toggle();
                self.status = format!("plot: {}", self.plot.label());
            }
            KeyCode::Char('r') => {
                self.seed = self.seed.wrapping_add(1);
                apply_pattern(&mut self.scenario, ShadingPattern::Random, RANDOM_SEVERITY, self.seed)?;
                self.reevaluate();
                self.status = format!("random shading (seed {})", self.seed);
            }
            KeyCode::Char('0') => {
                apply_pattern(&mut self.scenario, ShadingPattern::None, 0.0, 0)?;
                self.reevaluate();
                self.status = "full sun".to_string();
            }
            KeyCode::Char('d') => {
                match crate::debug::write_debug_bundle(
                    Path::new("debug"),
                    &self.scenario,
                    &self.presets,
                    &self.evals,
                    self.opts,
                    crate::debug::DEFAULT_STRIDE,
                ) {
                    Ok(path) => self.status = format!("Wrote debug bundle: {}", path.display()),
                    Err(err) => self.status = format!("Debug write failed: {err}"),
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn start_day(&mut self) {
        if self.day.is_some() {
            self.status = "day sweep already running (Esc cancels)".to_string();
            return;
        }
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let scenario = self.scenario.clone();
        let presets = self.presets.clone();
        let cfg = self.day_config.clone();
        let opts = self.opts;
        let flag = Arc::clone(&cancel);
        std::thread::spawn(move || {
            let _ = tx.send(run_day(&scenario, &presets, &cfg, opts, &flag));
        });

        self.day = Some(DayJob { cancel, rx });
        self.status = format!("day sweep {} running (Esc cancels)", self.day_config.date);
    }

    fn cancel_day(&mut self) {
        if let Some(job) = &self.day {
            job.cancel.store(true, Ordering::Relaxed);
            self.status = "cancelling day sweep".to_string();
        }
    }

    /// Pick up a finished day sweep. Returns `true` when the status changed.
    fn poll_day(&mut self) -> bool {
        let Some(job) = &self.day else {
            return false;
        };
        let outcome = match job.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(AppError::new(4, "day sweep worker stopped")),
        };
        self.day = None;
        self.status = match outcome {
            Ok(report) => day_status(&report),
            Err(err) => format!("day sweep failed: {err}"),
        };
        true
    }

    fn current_layout_len(&self) -> usize {
        self.scenario.strings[self.string_idx].cells.len()
    }

    fn selected_cell(&self) -> Option<usize> {
        self.scenario.strings[self.string_idx].cells.get(self.cell_pos).copied()
    }

    fn adjust_irradiance(&mut self, delta: f64) {
        let Some(idx) = self.selected_cell() else {
            return;
        };
        let cell = &mut self.scenario.cells[idx];
        // Round to the step grid so repeated presses land on clean values.
        let next = ((cell.irradiance_ratio() + delta) * 10.0).round() / 10.0;
        cell.irradiance = next.clamp(0.0, 1.0);
        self.status = format!("cell {idx}: irradiance {:.1}", cell.irradiance);
        self.reevaluate();
    }

    fn reevaluate(&mut self) {
        self.evals = evaluate_scenario(&self.scenario, &self.presets, self.opts);
    }

    fn current_eval(&self) -> Option<&StringEvaluation> {
        self.evals.get(self.string_idx)
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("pvs", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " · {} | string {}/{} | total {:.2} W of {:.2} W",
                self.scenario.name,
                self.string_idx + 1,
                self.scenario.strings.len(),
                total_power(&self.evals),
                total_ideal_power(&self.evals)
            )),
        ]));

        if let Some(e) = self.current_eval() {
            let layout = &self.scenario.strings[self.string_idx];
            lines.push(Line::from(Span::styled(
                format!(
                    "{} [{}] | V={:.3} V  I={:.3} A  P={:.3} W | ideal {:.3} W, loss {:.1}%",
                    e.name,
                    layout.bypass.label(),
                    e.result.voltage,
                    e.result.current,
                    e.result.power,
                    e.power_ideal,
                    100.0 * e.shading_loss()
                ),
                Style::default().fg(Color::Gray),
            )));
            let segments = if e.segment_active.is_empty() {
                "-".to_string()
            } else {
                format!("{}/{}", e.active_segments(), e.segment_active.len())
            };
            lines.push(Line::from(Span::styled(
                format!(
                    "bypassed cells: {} | active segments: {segments}",
                    e.result.bypassed_cell_count
                ),
                Style::default().fg(Color::Gray),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(0)])
            .split(area);

        self.draw_cells(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
    }

    fn draw_cells(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let layout = &self.scenario.strings[self.string_idx];
        let eval = self.current_eval();

        let items: Vec<ListItem> = layout
            .cells
            .iter()
            .enumerate()
            .map(|(pos, &idx)| {
                let irr = self.scenario.cells.get(idx).map(|c| c.irradiance_ratio()).unwrap_or(0.0);
                let bypassed = eval
                    .and_then(|e| e.result.bypassed.get(pos).copied())
                    .unwrap_or(false);
                let style = if bypassed {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                ListItem::new(format!(
                    "{pos:>3} c{idx:<4} {} {irr:.1} {}",
                    irradiance_bar(irr, 10),
                    if bypassed { "BYP" } else { "" }
                ))
                .style(style)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Cells").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.cell_pos));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("{} curve", self.plot.label());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(eval) = self.current_eval() else {
            return;
        };
        let series = chart_series(eval, self.plot);
        if series.curve.is_empty() {
            let msg = Paragraph::new("String is dark.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let y_label = match self.plot {
            PlotKind::Iv => "current (A)",
            PlotKind::Pv => "power (W)",
        };
        let (chart_rect, insets) = chart_layout(inner);
        let widget = CurvePlottersChart {
            curve: &series.curve,
            mpp: series.mpp,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "voltage (V)",
            y_label,
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &series, y_label);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ cell  ←/→ irradiance  s string  p IV/PV  r random  0 reset  d debug  y day  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn day_status(report: &DayReport) -> String {
    let mut status = format!(
        "day {}: {:.1} Wh, avg {:.2} W",
        report.date, report.ledger.total_wh, report.average_power_w
    );
    if let Some(t) = report.peak_time {
        status.push_str(&format!(", peak {:.2} W at {}", report.peak_power_w, t.format("%H:%M")));
    }
    if report.cancelled {
        status.push_str(" (cancelled, partial)");
    }
    status
}

fn irradiance_bar(irr: f64, width: usize) -> String {
    let filled = ((irr.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

struct ChartSeries {
    curve: Vec<(f64, f64)>,
    mpp: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(eval: &StringEvaluation, kind: PlotKind) -> ChartSeries {
    let trace = &eval.result.trace;
    if trace.pmax() <= 0.0 && trace.voc <= 0.0 {
        return ChartSeries {
            curve: Vec::new(),
            mpp: None,
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
        };
    }
    let curve = kind.points(trace);

    let v_max = curve.iter().map(|p| p.0).fold(0.0_f64, f64::max);
    let y_max = curve.iter().map(|p| p.1).fold(0.0_f64, f64::max);
    let x_bounds = [0.0, if v_max > 0.0 { v_max * 1.02 } else { 1.0 }];
    let y_bounds = [0.0, if y_max > 0.0 { y_max * 1.05 } else { 1.0 }];

    let mpp = (trace.pmax() > 0.0).then(|| kind.mpp(trace));
    ChartSeries {
        curve,
        mpp,
        x_bounds,
        y_bounds,
    }
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };
    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    series: &ChartSeries,
    y_label: &str,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = series.x_bounds[0] + u * (series.x_bounds[1] - series.x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(Paragraph::new(label).style(style), Rect { x: start, y, width, height: 1 });
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = series.y_bounds[0] + u * (series.y_bounds[1] - series.y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(Paragraph::new(label).style(style), Rect { x: start, y, width, height: 1 });
    }

    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        let x_label = Paragraph::new("voltage (V)").alignment(Alignment::Center).style(style);
        frame.render_widget(x_label, x_rect);
    }

    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    let y_label = Paragraph::new(y_label.to_string()).style(style.add_modifier(Modifier::BOLD));
    frame.render_widget(y_label, y_rect);
}
