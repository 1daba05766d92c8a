//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during simulation
//! - loaded from scenario / preset JSON
//! - exported alongside results

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::IvTrace;

/// Default number of samples per swept curve.
pub const DEFAULT_SAMPLES: usize = 200;

/// Smallest usable sample count (two points define a segment).
pub const MIN_SAMPLES: usize = 2;

/// Fixed electrical parameters of one cell type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParams {
    /// Open-circuit voltage at STC (V).
    pub voc: f64,
    /// Short-circuit current at STC (A).
    pub isc: f64,
    /// Diode ideality factor.
    pub ideality: f64,
    /// Series resistance (ohm).
    pub series_resistance: f64,
    /// Forward voltage drop of the bypass diode protecting this cell type (V).
    pub bypass_drop: f64,
}

impl CellParams {
    /// Every parameter is finite and non-negative.
    pub fn is_physical(&self) -> bool {
        [self.voc, self.isc, self.ideality, self.series_resistance, self.bypass_drop]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Built-in cell presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CellPreset {
    /// Monocrystalline silicon, full-size wafer.
    Mono,
    /// Polycrystalline silicon.
    Poly,
    /// Thin-film strip cell.
    #[value(name = "thinfilm")]
    ThinFilm,
}

impl CellPreset {
    pub const ALL: [CellPreset; 3] = [CellPreset::Mono, CellPreset::Poly, CellPreset::ThinFilm];

    /// Name used in scenario files (matches the serde / clap spelling).
    pub fn name(self) -> &'static str {
        match self {
            CellPreset::Mono => "mono",
            CellPreset::Poly => "poly",
            CellPreset::ThinFilm => "thinfilm",
        }
    }

    pub fn params(self) -> CellParams {
        match self {
            CellPreset::Mono => CellParams {
                voc: 0.70,
                isc: 10.0,
                ideality: 1.2,
                series_resistance: 0.004,
                bypass_drop: 0.35,
            },
            CellPreset::Poly => CellParams {
                voc: 0.63,
                isc: 8.9,
                ideality: 1.3,
                series_resistance: 0.006,
                bypass_drop: 0.35,
            },
            CellPreset::ThinFilm => CellParams {
                voc: 0.85,
                isc: 1.6,
                ideality: 1.6,
                series_resistance: 0.05,
                bypass_drop: 0.50,
            },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

/// One physical bypass diode spanning string positions `start_index..=end_index`.
///
/// Segments may overlap or nest (e.g. one diode per cell plus one per group).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentBypass {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub voltage_drop: f64,
}

impl SegmentBypass {
    pub fn new(start_index: usize, end_index: usize, voltage_drop: f64) -> Self {
        Self {
            start_index,
            end_index,
            voltage_drop,
        }
    }

    /// Number of cell positions spanned (0 for an inverted range).
    pub fn len(&self) -> usize {
        if self.end_index < self.start_index {
            0
        } else {
            self.end_index - self.start_index + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn covers(&self, position: usize) -> bool {
        (self.start_index..=self.end_index).contains(&position)
    }
}

/// One diode per cell.
pub fn per_cell_segments(n_cells: usize, voltage_drop: f64) -> Vec<SegmentBypass> {
    (0..n_cells)
        .map(|i| SegmentBypass::new(i, i, voltage_drop))
        .collect()
}

/// One diode per run of `group` consecutive cells (the last group may be shorter).
pub fn grouped_segments(n_cells: usize, group: usize, voltage_drop: f64) -> Vec<SegmentBypass> {
    let group = group.max(1);
    (0..n_cells)
        .step_by(group)
        .map(|start| SegmentBypass::new(start, (start + group - 1).min(n_cells - 1), voltage_drop))
        .collect()
}

/// Per-cell diodes nested inside per-group diodes.
pub fn nested_segments(n_cells: usize, group: usize, voltage_drop: f64) -> Vec<SegmentBypass> {
    let mut out = grouped_segments(n_cells, group, voltage_drop);
    out.extend(per_cell_segments(n_cells, voltage_drop));
    out
}

/// Resolution of a swept curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOptions {
    pub samples: usize,
}

impl SweepOptions {
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(MIN_SAMPLES),
        }
    }
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Operating point at maximum power plus the complete swept string curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringSimResult {
    /// Power at the operating point (W).
    pub power: f64,
    /// String voltage at the operating point (V).
    pub voltage: f64,
    /// String current at the operating point (A).
    pub current: f64,
    pub bypassed_cell_count: usize,
    /// Per-position bypass state at the operating point.
    pub bypassed: Vec<bool>,
    pub trace: IvTrace,
}

impl StringSimResult {
    /// Zeroed result for degenerate inputs.
    pub fn zeroed(n_cells: usize) -> Self {
        Self {
            power: 0.0,
            voltage: 0.0,
            current: 0.0,
            bypassed_cell_count: 0,
            bypassed: vec![false; n_cells],
            trace: IvTrace::dark(),
        }
    }
}

/// Segment-aware string result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSimResult {
    pub sim: StringSimResult,
    /// Which segments conduct at the operating point (parallel to the input segments).
    pub segment_active: Vec<bool>,
}
