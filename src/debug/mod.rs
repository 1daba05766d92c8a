//! Debug bundle writer for inspecting a scenario evaluation.
//!
//! The bundle is a Markdown file with the run parameters, a cells table, the
//! segment states of every string and a thinned dump of each string's sweep.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::domain::{BypassTopology, PresetTable, Scenario, SweepOptions};
use crate::error::AppError;
use crate::sim::{StringEvaluation, total_power};

/// Every `stride`-th sweep sample is written (the last one always is).
pub const DEFAULT_STRIDE: usize = 10;

pub fn write_debug_bundle(
    dir: &Path,
    scenario: &Scenario,
    presets: &PresetTable,
    evals: &[StringEvaluation],
    opts: SweepOptions,
    stride: usize,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let now = Local::now();
    let path = dir.join(format!(
        "pvs_debug_{}_{}.md",
        slug(&scenario.name),
        now.format("%Y%m%d_%H%M%S%3f")
    ));

    let text = render_bundle(scenario, presets, evals, opts, stride, &now.to_rfc3339());
    std::fs::write(&path, text)
        .map_err(|e| AppError::new(4, format!("Failed to write debug file '{}': {e}", path.display())))?;
    info!(path = %path.display(), "debug bundle written");
    Ok(path)
}

fn render_bundle(
    scenario: &Scenario,
    presets: &PresetTable,
    evals: &[StringEvaluation],
    opts: SweepOptions,
    stride: usize,
    generated: &str,
) -> String {
    let stride = stride.max(1);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# pvs debug bundle");
    let _ = writeln!(out, "- generated: {generated}");
    let _ = writeln!(out, "- scenario: {}", scenario.name);
    let _ = writeln!(out, "- default_preset: {}", scenario.default_preset);
    let _ = writeln!(out, "- samples: {}", opts.samples);
    let _ = writeln!(out, "- total_power_w: {:.6}", total_power(evals));

    let _ = writeln!(out, "\n## Cells");
    let _ = writeln!(out, "| cell | preset | irradiance | voc | isc | n | rs | bypass_drop |");
    let _ = writeln!(out, "| - | - | - | - | - | - | - | - |");
    for (idx, cell) in scenario.cells.iter().enumerate() {
        let name = cell.preset.as_deref().unwrap_or(&scenario.default_preset);
        match presets.resolve(name) {
            Some(p) => {
                let _ = writeln!(
                    out,
                    "| {idx} | {name} | {:.3} | {:.4} | {:.4} | {:.3} | {:.4} | {:.3} |",
                    cell.irradiance_ratio(),
                    p.voc,
                    p.isc,
                    p.ideality,
                    p.series_resistance,
                    p.bypass_drop
                );
            }
            None => {
                let _ = writeln!(out, "| {idx} | {name} (unknown) | {:.3} | - | - | - | - | - |", cell.irradiance_ratio());
            }
        }
    }

    for (layout, e) in scenario.strings.iter().zip(evals) {
        let _ = writeln!(out, "\n## String {}", e.name);
        let _ = writeln!(out, "- bypass: {}", layout.bypass.label());
        let _ = writeln!(
            out,
            "- operating point: V={:.6} I={:.6} P={:.6}",
            e.result.voltage, e.result.current, e.result.power
        );
        let _ = writeln!(out, "- bypassed cells: {}", e.result.bypassed_cell_count);

        let _ = writeln!(out, "\n### Positions");
        let _ = writeln!(out, "| pos | cell | isc | vmp | imp | bypassed | power_w |");
        let _ = writeln!(out, "| - | - | - | - | - | - | - |");
        for (pos, (&idx, trace)) in e.cells.iter().zip(&e.cell_traces).enumerate() {
            let _ = writeln!(
                out,
                "| {pos} | {idx} | {:.4} | {:.4} | {:.4} | {} | {:.4} |",
                trace.isc,
                trace.vmp,
                trace.imp,
                e.result.bypassed.get(pos).copied().unwrap_or(false),
                e.cell_power.get(pos).copied().unwrap_or(0.0)
            );
        }

        if let BypassTopology::Segments { segments } = &layout.bypass {
            let _ = writeln!(out, "\n### Segments");
            let _ = writeln!(out, "| # | start | end | drop | active |");
            let _ = writeln!(out, "| - | - | - | - | - |");
            for (k, seg) in segments.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "| {k} | {} | {} | {:.3} | {} |",
                    seg.start_index,
                    seg.end_index,
                    seg.voltage_drop,
                    e.segment_active.get(k).copied().unwrap_or(false)
                );
            }
        }

        let trace = &e.result.trace;
        let _ = writeln!(out, "\n### Sweep (every {stride} samples)");
        let _ = writeln!(out, "| k | current | voltage | power |");
        let _ = writeln!(out, "| - | - | - | - |");
        let last = trace.len().saturating_sub(1);
        for (k, (v, i)) in trace.points().enumerate() {
            if k % stride == 0 || k == last {
                let _ = writeln!(out, "| {k} | {i:.6} | {v:.6} | {:.6} |", i * v);
            }
        }
    }

    out
}

fn slug(name: &str) -> String {
    let s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if s.is_empty() { "scenario".to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellPreset;
    use crate::sim::evaluate_scenario;

    #[test]
    fn bundle_contains_tables_for_every_string() {
        let mut s = Scenario::demo(4, CellPreset::Mono);
        s.cells[5].irradiance = 0.0;
        let presets = PresetTable::default();
        let opts = SweepOptions::new(25);
        let evals = evaluate_scenario(&s, &presets, opts);

        let text = render_bundle(&s, &presets, &evals, opts, 10, "now");
        assert!(text.starts_with("# pvs debug bundle\n"));
        assert!(text.contains("## String A"));
        assert!(text.contains("## String B"));
        assert_eq!(text.matches("### Segments").count(), 1);
        assert!(text.contains("| 1 | 5 |"));
        // Samples 0, 10, 20 and the last one (24) for each string.
        assert_eq!(text.matches("\n| 24 |").count(), 2);
    }

    #[test]
    fn writes_a_markdown_file() {
        let dir = std::env::temp_dir().join(format!("pvs-debug-{}", std::process::id()));
        let s = Scenario::demo(2, CellPreset::Poly);
        let presets = PresetTable::default();
        let evals = evaluate_scenario(&s, &presets, SweepOptions::new(10));
        let path = write_debug_bundle(&dir, &s, &presets, &evals, SweepOptions::new(10), DEFAULT_STRIDE).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("md"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("demo-poly"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn slug_keeps_file_names_tame() {
        assert_eq!(slug("Roof East #2"), "roof_east__2");
        assert_eq!(slug(""), "scenario");
    }
}
