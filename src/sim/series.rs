//! Series aggregation with one optional bypass diode per cell.
//!
//! The string current is swept from `0` to the largest cell short-circuit
//! current. For each sampled current the string voltage is accumulated cell by
//! cell from the reference node:
//!
//! ```text
//! active = node + V_cell(I)     if I < Isc_cell, else -inf
//! node   = max(active, node - drop)   (cell has a bypass diode)
//! node   = active                     (no diode)
//! ```
//!
//! The `max` models the diode clamping: it conducts whenever holding the cell
//! at `-drop` leaves the node higher than forcing the cell to carry `I`.

use tracing::debug;

use crate::domain::{IvTrace, StringSimResult, SweepOptions};
use crate::math::linspace;
use crate::sim::sweep::SweepRecorder;

/// Combine cell traces wired in series into a string curve and its MPP.
///
/// `has_bypass[c]` marks which positions carry a diode; missing entries count
/// as `false`. All diodes share `bypass_drop`.
pub fn aggregate_string_series(
    cells: &[IvTrace],
    bypass_drop: f64,
    has_bypass: &[bool],
    opts: SweepOptions,
) -> StringSimResult {
    let n = cells.len();
    if n == 0 {
        debug!("series aggregation with no cells; returning zeroed result");
        return StringSimResult::zeroed(0);
    }

    let max_current = cells.iter().map(|c| c.isc).fold(0.0, f64::max);
    if !(max_current > 0.0 && max_current.is_finite()) {
        debug!(cells = n, "string is fully dark; returning zeroed result");
        return StringSimResult::zeroed(n);
    }

    let drop = if bypass_drop.is_finite() {
        bypass_drop.max(0.0)
    } else {
        0.0
    };
    let bypass_at = |c: usize| has_bypass.get(c).copied().unwrap_or(false);

    let samples = opts.samples.max(2);
    let mut recorder = SweepRecorder::with_capacity(samples);
    for current in linspace(0.0, max_current, samples) {
        let mut node = 0.0_f64;
        for (c, cell) in cells.iter().enumerate() {
            let active = if current < cell.isc {
                node + cell.voltage_at(current)
            } else {
                f64::NEG_INFINITY
            };
            node = if bypass_at(c) {
                active.max(node - drop)
            } else {
                active
            };
        }
        recorder.record(current, node);
    }

    let outcome = recorder.finish();
    let op = outcome.operating;

    let bypassed: Vec<bool> = cells
        .iter()
        .enumerate()
        .map(|(c, cell)| bypass_at(c) && cell.isc <= op.current)
        .collect();
    let bypassed_cell_count = bypassed.iter().filter(|&&b| b).count();

    debug!(
        cells = n,
        power = op.power,
        voltage = op.voltage,
        current = op.current,
        bypassed = bypassed_cell_count,
        "series string evaluated"
    );

    StringSimResult {
        power: op.power,
        voltage: op.voltage,
        current: op.current,
        bypassed_cell_count,
        bypassed,
        trace: outcome.trace,
    }
}
