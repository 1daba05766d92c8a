//! Scenario evaluation: build cell traces and aggregate every string.
//!
//! Strings share no state, so `evaluate_scenario` fans them out over rayon and
//! collects results back in string order.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{
    BypassTopology, CellParams, IvTrace, PresetTable, Scenario, SegmentBypass, StringLayout, StringSimResult,
    SweepOptions,
};
use crate::models::build_cell_trace;
use crate::sim::{SegmentIndex, aggregate_string_series, aggregate_string_with_segments};

/// Everything computed for one string in one evaluation.
#[derive(Debug, Clone)]
pub struct StringEvaluation {
    pub name: String,
    /// Scenario cell indices, in electrical order.
    pub cells: Vec<usize>,
    pub cell_traces: Vec<IvTrace>,
    pub result: StringSimResult,
    /// Segment states at the operating point (empty unless wired with segments).
    pub segment_active: Vec<bool>,
    /// Power delivered by each position at the operating point (W).
    ///
    /// A bypassed position carries its share of the conducting diode's drop, so
    /// its power is negative and the entries sum to `result.power`.
    pub cell_power: Vec<f64>,
    /// String power with every cell in full sun (W).
    pub power_ideal: f64,
}

impl StringEvaluation {
    pub fn active_segments(&self) -> usize {
        self.segment_active.iter().filter(|&&a| a).count()
    }

    /// Fraction of the full-sun power lost to shading (0 when nothing could be produced).
    pub fn shading_loss(&self) -> f64 {
        if self.power_ideal > 0.0 {
            (1.0 - self.result.power / self.power_ideal).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Evaluate one string of `scenario`.
///
/// Unknown presets (which `Scenario::validate` rejects up front) evaluate as dark cells.
///
/// `per_cell` diodes use `layout.bypass_drop` when set. Otherwise each diode
/// takes the drop of its own cell's preset; a string whose presets disagree is
/// aggregated through one-cell segments so every diode keeps its own drop.
pub fn evaluate_string(
    scenario: &Scenario,
    presets: &PresetTable,
    layout: &StringLayout,
    opts: SweepOptions,
) -> StringEvaluation {
    let mut traces = Vec::with_capacity(layout.cells.len());
    let mut drops: Vec<Option<f64>> = Vec::with_capacity(layout.cells.len());
    let mut full_sun: Vec<(CellParams, f64)> = Vec::new();
    let mut power_ideal = 0.0;
    for &idx in &layout.cells {
        let Some(params) = scenario.cell_params(presets, idx) else {
            warn!(string = %layout.name, cell = idx, "cell has no resolvable preset; treating as dark");
            traces.push(IvTrace::dark());
            drops.push(None);
            continue;
        };
        drops.push(Some(params.bypass_drop));
        power_ideal += full_sun_pmax(&mut full_sun, &params, opts);
        let irradiance = scenario.cells[idx].irradiance_ratio();
        traces.push(build_cell_trace(&params, irradiance, opts));
    }

    let (result, segment_active, bypass_share) = match &layout.bypass {
        BypassTopology::None => {
            let mask = vec![false; traces.len()];
            let result = aggregate_string_series(&traces, 0.0, &mask, opts);
            let share = vec![0.0; traces.len()];
            (result, Vec::new(), share)
        }
        BypassTopology::PerCell { mask } => {
            let mask = mask.clone().unwrap_or_else(|| vec![true; traces.len()]);
            let fallback = drops.iter().flatten().copied().next().unwrap_or(0.0);
            let per_cell: Vec<f64> = match layout.bypass_drop {
                Some(d) => vec![d; traces.len()],
                None => drops.iter().map(|d| d.unwrap_or(fallback)).collect(),
            };
            let protected: Vec<f64> = per_cell
                .iter()
                .enumerate()
                .filter(|(c, _)| mask.get(*c).copied().unwrap_or(false))
                .map(|(_, &d)| d)
                .collect();
            if protected.windows(2).all(|w| w[0] == w[1]) {
                let drop = protected.first().copied().unwrap_or(0.0);
                let result = aggregate_string_series(&traces, drop, &mask, opts);
                let share = result
                    .bypassed
                    .iter()
                    .map(|&b| if b { sanitize_drop(drop) } else { 0.0 })
                    .collect();
                (result, Vec::new(), share)
            } else {
                let segments: Vec<SegmentBypass> = per_cell
                    .iter()
                    .enumerate()
                    .filter(|(c, _)| mask.get(*c).copied().unwrap_or(false))
                    .map(|(c, &d)| SegmentBypass::new(c, c, d))
                    .collect();
                debug!(string = %layout.name, "per-cell diodes with mixed drops; using one-cell segments");
                let r = aggregate_string_with_segments(&traces, &segments, opts);
                let share = segment_shares(&traces, &segments, &r.sim);
                (r.sim, Vec::new(), share)
            }
        }
        BypassTopology::Segments { segments } => {
            let r = aggregate_string_with_segments(&traces, segments, opts);
            let share = segment_shares(&traces, segments, &r.sim);
            (r.sim, r.segment_active, share)
        }
    };

    let i_op = result.current;
    let cell_power = traces
        .iter()
        .zip(&result.bypassed)
        .zip(&bypass_share)
        .map(|((trace, &bypassed), &share)| {
            if bypassed {
                -share * i_op
            } else if i_op >= trace.isc {
                0.0
            } else {
                (i_op * trace.voltage_at(i_op)).max(0.0)
            }
        })
        .collect();

    debug!(
        string = %layout.name,
        power = result.power,
        power_ideal,
        bypassed = result.bypassed_cell_count,
        "string evaluation done"
    );

    StringEvaluation {
        name: layout.name.clone(),
        cells: layout.cells.clone(),
        cell_traces: traces,
        result,
        segment_active,
        cell_power,
        power_ideal,
    }
}

/// Full-sun maximum power of `params`, memoised per distinct preset.
fn full_sun_pmax(memo: &mut Vec<(CellParams, f64)>, params: &CellParams, opts: SweepOptions) -> f64 {
    if let Some((_, p)) = memo.iter().find(|(q, _)| q == params) {
        return *p;
    }
    let p = build_cell_trace(params, 1.0, opts).pmax();
    memo.push((*params, p));
    p
}

fn sanitize_drop(drop: f64) -> f64 {
    if drop.is_finite() { drop.max(0.0) } else { 0.0 }
}

/// Per-position share of the active diode drops at the operating point.
///
/// Each active segment's drop is split evenly over the cells it owns.
fn segment_shares(cells: &[IvTrace], segments: &[SegmentBypass], result: &StringSimResult) -> Vec<f64> {
    let n = cells.len();
    if n == 0 || segments.is_empty() || result.power <= 0.0 {
        return vec![0.0; n];
    }
    let index = SegmentIndex::new(segments, n);
    let at_op = index.resolve(|c| cells[c].isc <= result.current);

    let mut owned = vec![0usize; index.segment_count()];
    for s in at_op.owner.iter().flatten() {
        owned[*s] += 1;
    }
    at_op
        .owner
        .iter()
        .map(|o| match o {
            Some(s) if owned[*s] > 0 => index.drop_of(*s) / owned[*s] as f64,
            _ => 0.0,
        })
        .collect()
}

/// Evaluate every string of `scenario` in parallel; results keep string order.
pub fn evaluate_scenario(
    scenario: &Scenario,
    presets: &PresetTable,
    opts: SweepOptions,
) -> Vec<StringEvaluation> {
    scenario
        .strings
        .par_iter()
        .map(|layout| evaluate_string(scenario, presets, layout, opts))
        .collect()
}

/// Total power of a set of evaluations (W).
pub fn total_power(evals: &[StringEvaluation]) -> f64 {
    evals.iter().map(|e| e.result.power).sum()
}

/// Total full-sun power of a set of evaluations (W).
pub fn total_ideal_power(evals: &[StringEvaluation]) -> f64 {
    evals.iter().map(|e| e.power_ideal).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellPreset, CellSpec};

    fn scenario() -> Scenario {
        let mut s = Scenario::demo(6, CellPreset::Mono);
        s.cells[2].irradiance = 0.0;
        s.cells[8].irradiance = 0.0;
        s
    }

    #[test]
    fn evaluates_every_string_in_order() {
        let s = scenario();
        let evals = evaluate_scenario(&s, &PresetTable::default(), SweepOptions::default());
        assert_eq!(evals.len(), 2);
        assert_eq!(evals[0].name, "A");
        assert_eq!(evals[1].name, "B");
        for e in &evals {
            assert_eq!(e.cell_traces.len(), 6);
            assert_eq!(e.result.bypassed_cell_count, 1);
            assert!(e.result.power > 0.0);
        }
        assert!(evals[0].segment_active.is_empty());
        assert_eq!(evals[1].active_segments(), 1);
    }

    fn assert_cells_add_up(e: &StringEvaluation) {
        let sum: f64 = e.cell_power.iter().sum();
        assert!(
            (sum - e.result.power).abs() < 1e-9 * e.result.power.max(1.0),
            "{}: cells {sum} vs string {}",
            e.name,
            e.result.power
        );
    }

    #[test]
    fn bypassed_cells_carry_the_diode_loss() {
        let s = scenario();
        let evals = evaluate_scenario(&s, &PresetTable::default(), SweepOptions::default());
        for e in &evals {
            assert_cells_add_up(e);
            for (pos, &p) in e.cell_power.iter().enumerate() {
                if e.result.bypassed[pos] {
                    assert!(p < 0.0);
                } else {
                    assert!(p > 0.0);
                }
            }
        }
        let a = &evals[0];
        let drop = CellPreset::Mono.params().bypass_drop;
        assert!((a.cell_power[2] + drop * a.result.current).abs() < 1e-12);
    }

    #[test]
    fn three_cell_string_with_dark_middle_cell_adds_up() {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        s.cells[1].irradiance = 0.0;
        let e = evaluate_string(&s, &PresetTable::default(), &s.strings[0], SweepOptions::default());
        assert_eq!(e.result.bypassed_cell_count, 1);
        assert!(e.cell_power[1] < 0.0);
        assert_cells_add_up(&e);
    }

    #[test]
    fn mixed_presets_keep_their_own_diode_drop() {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        let lossy = CellParams {
            bypass_drop: 0.7,
            ..CellPreset::Mono.params()
        };
        s.presets.insert("mono-lossy".to_string(), lossy);
        s.cells[1] = CellSpec {
            preset: Some("mono-lossy".to_string()),
            irradiance: 0.0,
        };
        let presets = s.preset_table(&PresetTable::default());
        let mixed = evaluate_string(&s, &presets, &s.strings[0], SweepOptions::default());

        s.cells[1].preset = None;
        let uniform = evaluate_string(&s, &presets, &s.strings[0], SweepOptions::default());

        assert_eq!(mixed.result.bypassed_cell_count, 1);
        assert!(mixed.segment_active.is_empty());
        assert!((mixed.cell_power[1] + 0.7 * mixed.result.current).abs() < 1e-12);
        assert!(mixed.result.power < uniform.result.power);
        assert_cells_add_up(&mixed);
    }

    #[test]
    fn ideal_power_and_shading_loss() {
        let clear = Scenario::demo(6, CellPreset::Mono);
        let opts = SweepOptions::default();
        let full = build_cell_trace(&CellPreset::Mono.params(), 1.0, opts).pmax();

        let e = evaluate_string(&clear, &PresetTable::default(), &clear.strings[0], opts);
        assert!((e.power_ideal - 6.0 * full).abs() < 1e-9);
        assert!(e.shading_loss() < 0.02);

        let s = scenario();
        let shaded = evaluate_string(&s, &PresetTable::default(), &s.strings[0], opts);
        assert!((shaded.power_ideal - e.power_ideal).abs() < 1e-12);
        assert!(shaded.shading_loss() > 0.1);
        assert!(shaded.shading_loss() < 1.0);
    }

    #[test]
    fn no_bypass_topology_collapses_under_shade() {
        let mut s = scenario();
        s.strings[0].bypass = BypassTopology::None;
        let e = evaluate_string(&s, &PresetTable::default(), &s.strings[0], SweepOptions::default());
        assert_eq!(e.result.power, 0.0);
    }

    #[test]
    fn explicit_bypass_drop_overrides_preset() {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        s.cells[1].irradiance = 0.0;
        let base = evaluate_string(&s, &PresetTable::default(), &s.strings[0], SweepOptions::default());
        s.strings[0].bypass_drop = Some(0.7);
        let lossy = evaluate_string(&s, &PresetTable::default(), &s.strings[0], SweepOptions::default());
        assert!(lossy.result.power < base.result.power);
    }

    #[test]
    fn mixed_presets_resolve_per_cell() {
        let mut s = Scenario::demo(2, CellPreset::Mono);
        s.cells[1] = CellSpec {
            preset: Some("thinfilm".to_string()),
            irradiance: 1.0,
        };
        s.strings[1].bypass = BypassTopology::Segments {
            segments: vec![SegmentBypass::new(0, 1, 0.4)],
        };
        let e = evaluate_string(&s, &PresetTable::default(), &s.strings[0], SweepOptions::default());
        assert!((e.cell_traces[1].isc - CellPreset::ThinFilm.params().isc).abs() < 1e-12);
    }
}
