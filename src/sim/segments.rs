//! Series aggregation with arbitrary, possibly overlapping bypass segments.
//!
//! Per swept current:
//!
//! 1. cells whose short-circuit current is at or below the sweep current are *weak*
//! 2. each weak cell activates the smallest segment covering it
//! 3. every cell is owned by the smallest *active* segment covering it (if any);
//!    owned cells are bypassed
//! 4. string voltage = Σ unbypassed cell voltages − Σ active segment drops
//!
//! Smallest-wins mirrors real hardware: the finest diode clamps first and spares
//! the coarser group diodes. Ties between equally sized segments go to the lower
//! segment index.
//!
//! Segments are static across the sweep, so the per-cell covering lists are
//! sorted once up front (`SegmentIndex`) instead of being rescanned per sample.

use tracing::debug;

use crate::domain::{IvTrace, SegmentBypass, SegmentSimResult, StringSimResult, SweepOptions};
use crate::math::linspace;
use crate::sim::sweep::SweepRecorder;

/// Per-cell covering segments, finest first.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    drops: Vec<f64>,
    covering: Vec<Vec<usize>>,
}

/// Which segments conduct and which segment owns each cell, for one current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassResolution {
    pub active: Vec<bool>,
    pub owner: Vec<Option<usize>>,
}

impl BypassResolution {
    pub fn bypassed(&self) -> Vec<bool> {
        self.owner.iter().map(Option::is_some).collect()
    }

    pub fn bypassed_count(&self) -> usize {
        self.owner.iter().filter(|o| o.is_some()).count()
    }
}

impl SegmentIndex {
    /// Index `segments` over a string of `n_cells` positions.
    ///
    /// Ends past the string are clamped; segments starting past it or with an
    /// inverted range never cover anything.
    pub fn new(segments: &[SegmentBypass], n_cells: usize) -> Self {
        let mut covering: Vec<Vec<usize>> = vec![Vec::new(); n_cells];
        let mut spans = vec![0usize; segments.len()];

        for (s, seg) in segments.iter().enumerate() {
            if seg.is_empty() || seg.start_index >= n_cells {
                continue;
            }
            let end = seg.end_index.min(n_cells - 1);
            spans[s] = end - seg.start_index + 1;
            for list in &mut covering[seg.start_index..=end] {
                list.push(s);
            }
        }
        for list in &mut covering {
            list.sort_by_key(|&s| (spans[s], s));
        }

        let drops = segments
            .iter()
            .map(|seg| {
                if seg.voltage_drop.is_finite() {
                    seg.voltage_drop.max(0.0)
                } else {
                    0.0
                }
            })
            .collect();

        Self { drops, covering }
    }

    pub fn segment_count(&self) -> usize {
        self.drops.len()
    }

    /// Sanitised drop of segment `s` (V); `0` for unknown segments.
    pub fn drop_of(&self, s: usize) -> f64 {
        self.drops.get(s).copied().unwrap_or(0.0)
    }

    /// Finest segment covering `cell`.
    pub fn smallest_covering(&self, cell: usize) -> Option<usize> {
        self.covering.get(cell).and_then(|l| l.first().copied())
    }

    /// Resolve diode states given which cells are weak.
    pub fn resolve(&self, weak: impl Fn(usize) -> bool) -> BypassResolution {
        let mut active = vec![false; self.drops.len()];
        for (c, list) in self.covering.iter().enumerate() {
            if weak(c) {
                if let Some(&s) = list.first() {
                    active[s] = true;
                }
            }
        }

        let owner = self
            .covering
            .iter()
            .map(|list| list.iter().copied().find(|&s| active[s]))
            .collect();

        BypassResolution { active, owner }
    }

    /// Total drop of the active segments, each counted once.
    pub fn active_drop(&self, active: &[bool]) -> f64 {
        self.drops
            .iter()
            .zip(active)
            .filter(|(_, on)| **on)
            .map(|(d, _)| *d)
            .sum()
    }
}

/// Combine cell traces into a string curve using segment bypass diodes.
pub fn aggregate_string_with_segments(
    cells: &[IvTrace],
    segments: &[SegmentBypass],
    opts: SweepOptions,
) -> SegmentSimResult {
    let n = cells.len();
    let zeroed = || SegmentSimResult {
        sim: StringSimResult::zeroed(n),
        segment_active: vec![false; segments.len()],
    };

    if n == 0 || segments.is_empty() {
        debug!(
            cells = n,
            segments = segments.len(),
            "segment aggregation without cells or segments; returning zeroed result"
        );
        return zeroed();
    }

    let max_current = cells.iter().map(|c| c.isc).fold(0.0, f64::max);
    if !(max_current > 0.0 && max_current.is_finite()) {
        debug!(cells = n, "string is fully dark; returning zeroed result");
        return zeroed();
    }

    let index = SegmentIndex::new(segments, n);
    let samples = opts.samples.max(2);
    let mut recorder = SweepRecorder::with_capacity(samples);

    for current in linspace(0.0, max_current, samples) {
        let resolution = index.resolve(|c| cells[c].isc <= current);

        let mut total = -index.active_drop(&resolution.active);
        for (c, cell) in cells.iter().enumerate() {
            if resolution.owner[c].is_some() {
                continue;
            }
            total += if current < cell.isc {
                cell.voltage_at(current)
            } else {
                f64::NEG_INFINITY
            };
        }
        recorder.record(current, total);
    }

    let outcome = recorder.finish();
    let op = outcome.operating;

    let at_op = index.resolve(|c| cells[c].isc <= op.current);
    let bypassed = at_op.bypassed();
    let bypassed_cell_count = at_op.bypassed_count();

    debug!(
        cells = n,
        segments = segments.len(),
        power = op.power,
        active = at_op.active.iter().filter(|&&a| a).count(),
        bypassed = bypassed_cell_count,
        "segmented string evaluated"
    );

    SegmentSimResult {
        sim: StringSimResult {
            power: op.power,
            voltage: op.voltage,
            current: op.current,
            bypassed_cell_count,
            bypassed,
            trace: outcome.trace,
        },
        segment_active: at_op.active,
    }
}
