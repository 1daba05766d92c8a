//! ASCII plotting of I–V / P–V curves for terminal output.
//!
//! Fixed-size character grid, deterministic output (useful for golden tests).
//!
//! Plot elements:
//! - curves: `-` for the first series, then `=`, `~`, `+`, `:`
//! - maximum power point of each series: `*`

use crate::domain::IvTrace;

const CURVE_CHARS: [char; 5] = ['-', '=', '~', '+', ':'];

/// Which quantity goes on the vertical axis (voltage is always horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotKind {
    #[default]
    Iv,
    Pv,
}

impl PlotKind {
    pub fn toggle(self) -> Self {
        match self {
            PlotKind::Iv => PlotKind::Pv,
            PlotKind::Pv => PlotKind::Iv,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlotKind::Iv => "IV",
            PlotKind::Pv => "PV",
        }
    }

    pub fn y_unit(self) -> &'static str {
        match self {
            PlotKind::Iv => "A",
            PlotKind::Pv => "W",
        }
    }

    /// `(voltage, y)` points of `trace` in sweep order.
    pub fn points(self, trace: &IvTrace) -> Vec<(f64, f64)> {
        match self {
            PlotKind::Iv => trace.points().collect(),
            PlotKind::Pv => trace.power_points().collect(),
        }
    }

    /// The maximum power point in this plot's coordinates.
    pub fn mpp(self, trace: &IvTrace) -> (f64, f64) {
        match self {
            PlotKind::Iv => (trace.vmp, trace.imp),
            PlotKind::Pv => (trace.vmp, trace.pmax()),
        }
    }
}

/// One labelled curve.
#[derive(Debug, Clone, Copy)]
pub struct PlotSeries<'a> {
    pub label: &'a str,
    pub trace: &'a IvTrace,
}

/// Render a single trace.
pub fn render_trace_plot(trace: &IvTrace, kind: PlotKind, width: usize, height: usize) -> String {
    render_ascii_plot(&[PlotSeries { label: "", trace }], kind, width, height)
}

/// Render several traces on shared axes.
pub fn render_ascii_plot(series: &[PlotSeries<'_>], kind: PlotKind, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curves: Vec<Vec<(f64, f64)>> = series.iter().map(|s| kind.points(s.trace)).collect();
    let (v_min, v_max) = axis_range(curves.iter().flatten().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = axis_range(curves.iter().flatten().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (k, curve) in curves.iter().enumerate() {
        let ch = CURVE_CHARS[k % CURVE_CHARS.len()];
        draw_curve(&mut grid, curve, (v_min, v_max), (y_min, y_max), ch);
    }

    // MPP markers last so they sit on top of every curve.
    for s in series {
        if s.trace.pmax() <= 0.0 {
            continue;
        }
        let (v, y) = kind.mpp(s.trace);
        let x = map_x(v, v_min, v_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = '*';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | V=[{v_min:.3}, {v_max:.3}] V | {}=[{y_min:.3}, {y_max:.3}] {}\n",
        kind.label(),
        if kind == PlotKind::Iv { "I" } else { "P" },
        kind.y_unit(),
    ));
    if series.len() > 1 {
        let legend: Vec<String> = series
            .iter()
            .enumerate()
            .map(|(k, s)| format!("{} {}", CURVE_CHARS[k % CURVE_CHARS.len()], s.label))
            .collect();
        out.push_str(&format!("Legend: {}\n", legend.join("  ")));
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, v_min: f64, v_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_range: (f64, f64), y_range: (f64, f64), ch: char) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(v, y) in curve {
        if !(v.is_finite() && y.is_finite()) {
            continue;
        }
        let x = map_x(v, x_range.0, x_range.1, width);
        let yy = map_y(y, y_range.0, y_range.1, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => grid[yy][x] = ch,
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
