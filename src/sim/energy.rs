//! Energy integration over repeated evaluations.
//!
//! Each tick contributes `power × dt` to per-string, per-cell and per-hour
//! totals. Cell energy is the power each cell delivered at its string's operating
//! point; a bypassed cell books its diode loss as negative energy, so a string's
//! cells add up to the string's own energy.

use serde::{Deserialize, Serialize};

use crate::sim::StringEvaluation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyLedger {
    /// Watt-hours per string (scenario string order).
    pub per_string_wh: Vec<f64>,
    /// Watt-hours per scenario cell index.
    pub per_cell_wh: Vec<f64>,
    /// Watt-hours per hour of day (0–23).
    pub per_hour_wh: [f64; 24],
    pub total_wh: f64,
    pub ticks: usize,
}

impl EnergyLedger {
    pub fn new(n_strings: usize, n_cells: usize) -> Self {
        Self {
            per_string_wh: vec![0.0; n_strings],
            per_cell_wh: vec![0.0; n_cells],
            per_hour_wh: [0.0; 24],
            total_wh: 0.0,
            ticks: 0,
        }
    }

    /// Accumulate one tick of `dt_hours` at `hour` (values ≥ 24 wrap).
    pub fn record(&mut self, hour: u32, evals: &[StringEvaluation], dt_hours: f64) {
        self.ticks += 1;
        self.accumulate(hour, evals, sanitize(dt_hours));
    }

    /// Accumulate one tick whose power is the mean of several evaluations
    /// (e.g. one per panel heading).
    pub fn record_mean(&mut self, hour: u32, runs: &[Vec<StringEvaluation>], dt_hours: f64) {
        self.ticks += 1;
        if runs.is_empty() {
            return;
        }
        let dt = sanitize(dt_hours) / runs.len() as f64;
        for evals in runs {
            self.accumulate(hour, evals, dt);
        }
    }

    fn accumulate(&mut self, hour: u32, evals: &[StringEvaluation], dt: f64) {
        let hour = (hour % 24) as usize;
        if dt == 0.0 {
            return;
        }

        for (s, eval) in evals.iter().enumerate() {
            let wh = sanitize(eval.result.power) * dt;
            if let Some(slot) = self.per_string_wh.get_mut(s) {
                *slot += wh;
            }
            self.per_hour_wh[hour] += wh;
            self.total_wh += wh;

            for (&cell, &p) in eval.cells.iter().zip(&eval.cell_power) {
                if let Some(slot) = self.per_cell_wh.get_mut(cell) {
                    *slot += finite(p) * dt;
                }
            }
        }
    }

    /// Hour with the largest yield, if anything was produced.
    pub fn best_hour(&self) -> Option<(usize, f64)> {
        self.per_hour_wh
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, wh)| *wh > 0.0)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

fn finite(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IvTrace, StringSimResult};

    fn eval(power: f64, cells: Vec<usize>, cell_power: Vec<f64>) -> StringEvaluation {
        let n = cells.len();
        StringEvaluation {
            name: "S".to_string(),
            cells,
            cell_traces: vec![IvTrace::dark(); n],
            result: StringSimResult {
                power,
                ..StringSimResult::zeroed(n)
            },
            segment_active: Vec::new(),
            cell_power,
            power_ideal: power,
        }
    }

    #[test]
    fn accumulates_power_times_dt() {
        let mut ledger = EnergyLedger::new(2, 4);
        let evals = vec![eval(100.0, vec![0, 1], vec![50.0, 52.0]), eval(40.0, vec![2, 3], vec![20.0, 0.0])];
        ledger.record(12, &evals, 0.5);
        ledger.record(13, &evals, 0.25);

        assert!((ledger.per_string_wh[0] - 75.0).abs() < 1e-12);
        assert!((ledger.per_string_wh[1] - 30.0).abs() < 1e-12);
        assert!((ledger.per_hour_wh[12] - 70.0).abs() < 1e-12);
        assert!((ledger.per_hour_wh[13] - 35.0).abs() < 1e-12);
        assert!((ledger.total_wh - 105.0).abs() < 1e-12);
        assert!((ledger.per_cell_wh[1] - 39.0).abs() < 1e-12);
        assert_eq!(ledger.per_cell_wh[3], 0.0);
        assert_eq!(ledger.ticks, 2);
        assert_eq!(ledger.best_hour(), Some((12, 70.0)));
    }

    #[test]
    fn ignores_invalid_power_and_dt() {
        let mut ledger = EnergyLedger::new(1, 1);
        ledger.record(1, &[eval(f64::NAN, vec![0], vec![f64::INFINITY])], 1.0);
        ledger.record(2, &[eval(10.0, vec![0], vec![10.0])], -1.0);
        assert_eq!(ledger.total_wh, 0.0);
        assert_eq!(ledger.per_cell_wh[0], 0.0);
        assert_eq!(ledger.best_hour(), None);
    }

    #[test]
    fn hours_wrap_and_unknown_cells_are_skipped() {
        let mut ledger = EnergyLedger::new(1, 1);
        ledger.record(25, &[eval(8.0, vec![0, 7], vec![4.0, 4.0])], 1.0);
        assert_eq!(ledger.per_hour_wh[1], 8.0);
        assert_eq!(ledger.per_cell_wh, vec![4.0]);
    }

    #[test]
    fn bypass_losses_stay_in_the_cell_totals() {
        let mut ledger = EnergyLedger::new(1, 3);
        ledger.record(10, &[eval(9.0, vec![0, 1, 2], vec![5.0, -1.0, 5.0])], 2.0);
        assert_eq!(ledger.per_cell_wh, vec![10.0, -2.0, 10.0]);
        let cells: f64 = ledger.per_cell_wh.iter().sum();
        assert!((cells - ledger.per_string_wh[0]).abs() < 1e-12);
    }

    #[test]
    fn mean_of_runs_counts_as_one_tick() {
        let mut ledger = EnergyLedger::new(1, 1);
        let runs = vec![vec![eval(10.0, vec![0], vec![10.0])], vec![eval(30.0, vec![0], vec![30.0])]];
        ledger.record_mean(12, &runs, 0.5);
        assert_eq!(ledger.ticks, 1);
        assert!((ledger.total_wh - 10.0).abs() < 1e-12);
        assert!((ledger.per_cell_wh[0] - 10.0).abs() < 1e-12);
        assert!((ledger.per_hour_wh[12] - 10.0).abs() < 1e-12);

        ledger.record_mean(13, &[], 0.5);
        assert_eq!(ledger.ticks, 2);
        assert_eq!(ledger.per_hour_wh[13], 0.0);
    }

}
