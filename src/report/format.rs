//! Formatted terminal output for cells, strings and day sweeps.
//!
//! All formatting lives here so the simulation code stays free of presentation
//! concerns and output changes are localized.

use crate::data::DayReport;
use crate::domain::{CellParams, IvTrace, Scenario, SweepOptions};
use crate::report::WeakCell;
use crate::sim::{StringEvaluation, total_ideal_power, total_power};

/// Single-cell summary (`pvs cell`).
pub fn format_cell_summary(label: &str, params: &CellParams, irradiance: f64, trace: &IvTrace) -> String {
    let mut out = String::new();
    out.push_str("=== pvs - single cell ===\n");
    out.push_str(&format!("Preset: {label} | irradiance={irradiance:.3}\n"));
    out.push_str(&format!(
        "Params: Voc={:.3}V Isc={:.3}A n={:.2} Rs={:.4}ohm bypass={:.2}V\n",
        params.voc, params.isc, params.ideality, params.series_resistance, params.bypass_drop
    ));
    out.push_str(&format!("Samples: {}\n\n", trace.len()));
    out.push_str(&format!("Voc  {:>9.4} V\n", trace.voc));
    out.push_str(&format!("Isc  {:>9.4} A\n", trace.isc));
    out.push_str(&format!("Vmp  {:>9.4} V\n", trace.vmp));
    out.push_str(&format!("Imp  {:>9.4} A\n", trace.imp));
    out.push_str(&format!("Pmax {:>9.4} W\n", trace.pmax()));
    if trace.voc > 0.0 && trace.isc > 0.0 {
        out.push_str(&format!("FF   {:>9.4}\n", trace.pmax() / (trace.voc * trace.isc)));
    }
    out
}

/// Scenario summary: one row per string (`pvs sim`).
pub fn format_run_summary(scenario: &Scenario, evals: &[StringEvaluation], opts: SweepOptions) -> String {
    let mut out = String::new();
    out.push_str("=== pvs - string simulation ===\n");
    out.push_str(&format!(
        "Scenario: {} | cells={} | strings={} | samples={}\n\n",
        scenario.name,
        scenario.cells.len(),
        scenario.strings.len(),
        opts.samples
    ));

    out.push_str(
        format!(
            "{:<12} {:<16} {:>5} {:>9} {:>9} {:>9} {:>9} {:>6} {:>8} {:>8}",
            "string", "bypass", "cells", "V_op", "I_op", "P_op", "P_ideal", "loss%", "bypassed", "segments"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<12} {:-<16} {:-<5} {:-<9} {:-<9} {:-<9} {:-<9} {:-<6} {:-<8} {:-<8}\n",
        "", "", "", "", "", "", "", "", "", ""
    ));

    for (layout, e) in scenario.strings.iter().zip(evals) {
        let segments = if e.segment_active.is_empty() {
            "-".to_string()
        } else {
            format!("{}/{}", e.active_segments(), e.segment_active.len())
        };
        out.push_str(&format!(
            "{:<12} {:<16} {:>5} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>6.1} {:>8} {:>8}\n",
            truncate(&e.name, 12),
            truncate(&layout.bypass.label(), 16),
            e.cells.len(),
            e.result.voltage,
            e.result.current,
            e.result.power,
            e.power_ideal,
            100.0 * e.shading_loss(),
            e.result.bypassed_cell_count,
            segments,
        ));
    }

    let total = total_power(evals);
    let ideal = total_ideal_power(evals);
    out.push_str(&format!("\nTotal power: {total:.3} W"));
    if ideal > 0.0 {
        let loss = (1.0 - total / ideal).clamp(0.0, 1.0);
        out.push_str(&format!(" of {ideal:.3} W in full sun (shading loss {:.1}%)", 100.0 * loss));
    }
    out.push('\n');
    out
}

/// Per-cell table for one evaluated string.
pub fn format_string_cells(scenario: &Scenario, eval: &StringEvaluation) -> String {
    let mut out = String::new();
    out.push_str(&format!("String {} (I_op={:.3} A):\n", eval.name, eval.result.current));
    out.push_str(
        format!(
            "{:>4} {:>5} {:>10} {:>7} {:>8} {:>8} {:>8} {:<8}",
            "pos", "cell", "preset", "irr", "Isc", "V@I", "P", "state"
        )
        .trim_end(),
    );
    out.push('\n');

    for (pos, &idx) in eval.cells.iter().enumerate() {
        let Some(cell) = scenario.cells.get(idx) else {
            continue;
        };
        let trace = &eval.cell_traces[pos];
        let bypassed = eval.result.bypassed.get(pos).copied().unwrap_or(false);
        let v = if bypassed { 0.0 } else { trace.voltage_at(eval.result.current) };
        out.push_str(
            format!(
                "{:>4} {:>5} {:>10} {:>7.3} {:>8.3} {:>8.3} {:>8.3} {:<8}",
                pos,
                idx,
                truncate(cell.preset.as_deref().unwrap_or(&scenario.default_preset), 10),
                cell.irradiance_ratio(),
                trace.isc,
                v,
                eval.cell_power.get(pos).copied().unwrap_or(0.0),
                if bypassed { "BYPASS" } else { "ok" },
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Day sweep summary with an hourly bar chart.
pub fn format_day_summary(scenario: &Scenario, report: &DayReport, weakest: &[WeakCell]) -> String {
    let ledger = &report.ledger;
    let mut out = String::new();
    out.push_str("=== pvs - day sweep ===\n");
    out.push_str(&format!("Scenario: {} | date={}\n", scenario.name, report.date));
    out.push_str(&format!("Ticks: {}", report.ticks.len()));
    if report.cancelled {
        out.push_str(" (cancelled)");
    }
    out.push('\n');
    out.push_str(&format!("Energy: {:.2} Wh\n", ledger.total_wh));
    out.push_str(&format!(
        "Average: {:.3} W over {:.2} h of daylight\n",
        report.average_power_w, report.daylight_hours
    ));
    match report.peak_time {
        Some(t) => out.push_str(&format!("Peak: {:.3} W at {}\n", report.peak_power_w, t.format("%H:%M"))),
        None => out.push_str("Peak: no production\n"),
    }

    out.push_str("\nPer string:\n");
    for (layout, wh) in scenario.strings.iter().zip(&ledger.per_string_wh) {
        out.push_str(&format!("  {:<12} {:>10.2} Wh\n", truncate(&layout.name, 12), wh));
    }

    let max_hour = ledger.per_hour_wh.iter().copied().fold(0.0_f64, f64::max);
    if max_hour > 0.0 {
        out.push_str("\nHourly yield:\n");
        for (h, wh) in ledger.per_hour_wh.iter().enumerate() {
            if *wh <= 0.0 {
                continue;
            }
            let bar = ((wh / max_hour) * 40.0).round() as usize;
            out.push_str(&format!("  {h:02}h {:>9.2} Wh |{}\n", wh, "#".repeat(bar)));
        }
    }

    if !weakest.is_empty() {
        out.push_str("\nLowest-yield cells:\n");
        for w in weakest {
            out.push_str(&format!("  cell {:>4} {:>10.3} Wh\n", w.cell, w.energy_wh));
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
