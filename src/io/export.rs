//! Export simulation results to CSV/JSON.
//!
//! The CSV holds the string-level I–V traces, one row per sample, so it can be
//! plotted directly in a spreadsheet. The JSON is a compact summary per string.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::data::DayReport;
use crate::domain::IvTrace;
use crate::error::AppError;
use crate::sim::StringEvaluation;

/// Write every string's aggregated trace to a CSV file.
pub fn write_traces_csv(path: &Path, evals: &[StringEvaluation]) -> Result<(), AppError> {
    write_named_traces_csv(path, evals.iter().map(|e| (e.name.as_str(), &e.result.trace)))
}

/// Write labelled traces to a CSV file, one row per sample.
pub fn write_named_traces_csv<'a>(
    path: &Path,
    traces: impl IntoIterator<Item = (&'a str, &'a IvTrace)>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "string,index,current_a,voltage_v,power_w")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (name, trace) in traces {
        let name = csv_field(name);
        for (k, (v, i)) in trace.points().enumerate() {
            writeln!(out, "{name},{k},{i:.6},{v:.6},{:.6}", i * v)
                .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// One string in the JSON summary.
#[derive(Debug, Clone, Serialize)]
pub struct StringSummary<'a> {
    pub name: &'a str,
    pub power_w: f64,
    pub power_ideal_w: f64,
    pub shading_loss_pct: f64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub bypassed_cells: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_segments: Vec<usize>,
    pub cell_power_w: &'a [f64],
    pub trace: &'a IvTrace,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsSummary<'a> {
    pub scenario: &'a str,
    pub samples: usize,
    pub total_power_w: f64,
    pub total_power_ideal_w: f64,
    pub strings: Vec<StringSummary<'a>>,
}

impl<'a> ResultsSummary<'a> {
    pub fn new(scenario: &'a str, samples: usize, evals: &'a [StringEvaluation]) -> Self {
        let strings = evals
            .iter()
            .map(|e| StringSummary {
                name: &e.name,
                power_w: e.result.power,
                power_ideal_w: e.power_ideal,
                shading_loss_pct: 100.0 * e.shading_loss(),
                voltage_v: e.result.voltage,
                current_a: e.result.current,
                bypassed_cells: positions(&e.result.bypassed),
                active_segments: positions(&e.segment_active),
                cell_power_w: &e.cell_power,
                trace: &e.result.trace,
            })
            .collect();
        Self {
            scenario,
            samples,
            total_power_w: crate::sim::total_power(evals),
            total_power_ideal_w: crate::sim::total_ideal_power(evals),
            strings,
        }
    }
}

fn positions(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(i, &f)| f.then_some(i))
        .collect()
}

/// Write a day sweep report as pretty JSON.
pub fn write_day_json(path: &Path, report: &DayReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(4, format!("Failed to write day JSON: {e}")))?;
    Ok(())
}

/// Write the per-string summary as pretty JSON.
pub fn write_results_json(path: &Path, summary: &ResultsSummary<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(4, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellPreset, PresetTable, Scenario, SweepOptions};
    use crate::sim::evaluate_scenario;

    fn evals() -> (Scenario, Vec<StringEvaluation>) {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        s.cells[1].irradiance = 0.0;
        let e = evaluate_scenario(&s, &PresetTable::default(), SweepOptions::new(20));
        (s, e)
    }

    #[test]
    fn csv_has_one_row_per_sample() {
        let (_, evals) = evals();
        let path = std::env::temp_dir().join(format!("pvs-{}-traces.csv", std::process::id()));
        write_traces_csv(&path, &evals).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("string,index,current_a,voltage_v,power_w"));
        let expected: usize = evals.iter().map(|e| e.result.trace.len()).sum();
        assert_eq!(lines.count(), expected);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn json_summary_lists_bypassed_positions() {
        let (s, evals) = evals();
        let summary = ResultsSummary::new(&s.name, 20, &evals);
        assert_eq!(summary.strings[0].bypassed_cells, vec![1]);
        assert!(summary.strings[0].shading_loss_pct > 0.0);
        assert!(summary.total_power_ideal_w > summary.total_power_w);

        let path = std::env::temp_dir().join(format!("pvs-{}-results.json", std::process::id()));
        write_results_json(&path, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scenario"], "demo-mono");
        assert_eq!(value["strings"].as_array().unwrap().len(), 2);
        assert!(value["strings"][0].get("active_segments").is_none());
        assert_eq!(value["strings"][0]["trace"]["current"].as_array().unwrap().len(), evals[0].result.trace.len());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn single_trace_csv_uses_the_label() {
        let params = CellPreset::Mono.params();
        let trace = crate::models::build_cell_trace(&params, 1.0, SweepOptions::new(5));
        let path = std::env::temp_dir().join(format!("pvs-{}-cell.csv", std::process::id()));
        write_named_traces_csv(&path, [("cell,mono", &trace)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().nth(1).unwrap().starts_with("\"cell,mono\",0,"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn names_with_commas_are_quoted() {
        assert_eq!(csv_field("east"), "east");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
