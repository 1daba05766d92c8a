//! Shared "scenario pipeline" used by both CLI and TUI front-ends.
//!
//! resolve scenario -> merge presets -> optional shading pattern -> evaluate
//!
//! The front-ends then only deal with presentation.

use std::path::Path;

use tracing::info;

use crate::data::{ShadingPattern, apply_pattern};
use crate::domain::{CellPreset, PresetTable, Scenario, SweepOptions};
use crate::error::AppError;
use crate::sim::{StringEvaluation, evaluate_scenario, total_power};

/// All computed outputs of one `pvs sim` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub scenario: Scenario,
    /// Base presets merged with the scenario's own.
    pub presets: PresetTable,
    pub opts: SweepOptions,
    pub evals: Vec<StringEvaluation>,
}

/// Where the scenario comes from.
#[derive(Debug, Clone, Copy)]
pub enum ScenarioSource<'a> {
    File(&'a Path),
    Demo { cells_per_string: usize, preset: CellPreset },
}

pub fn load_scenario(source: ScenarioSource<'_>, base: &PresetTable) -> Result<Scenario, AppError> {
    match source {
        ScenarioSource::File(path) => crate::io::read_scenario_json(path, base),
        ScenarioSource::Demo {
            cells_per_string,
            preset,
        } => {
            if cells_per_string == 0 {
                return Err(AppError::new(2, "A string needs at least one cell."));
            }
            Ok(Scenario::demo(cells_per_string, preset))
        }
    }
}

/// Optional shading pattern to stamp over the scenario's irradiance.
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub pattern: ShadingPattern,
    pub severity: f64,
    pub seed: u64,
}

/// Evaluate `scenario` after applying `pattern`.
pub fn run_scenario(
    mut scenario: Scenario,
    base: &PresetTable,
    pattern: Option<PatternSpec>,
    opts: SweepOptions,
) -> Result<RunOutput, AppError> {
    let presets = scenario.preset_table(base);
    scenario.validate(&presets)?;

    if let Some(p) = pattern {
        apply_pattern(&mut scenario, p.pattern, p.severity, p.seed)?;
    }

    let evals = evaluate_scenario(&scenario, &presets, opts);
    info!(
        scenario = %scenario.name,
        strings = evals.len(),
        total_power = total_power(&evals),
        "scenario evaluated"
    );

    Ok(RunOutput {
        scenario,
        presets,
        opts,
        evals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_source_rejects_empty_strings() {
        let source = ScenarioSource::Demo {
            cells_per_string: 0,
            preset: CellPreset::Mono,
        };
        assert!(load_scenario(source, &PresetTable::default()).is_err());
    }

    #[test]
    fn pattern_changes_the_result() {
        let base = PresetTable::default();
        let scenario = Scenario::demo(6, CellPreset::Mono);
        let clear = run_scenario(scenario.clone(), &base, None, SweepOptions::new(60)).unwrap();
        let shaded = run_scenario(
            scenario,
            &base,
            Some(PatternSpec {
                pattern: ShadingPattern::Single,
                severity: 1.0,
                seed: 0,
            }),
            SweepOptions::new(60),
        )
        .unwrap();
        assert!(total_power(&shaded.evals) < total_power(&clear.evals));
        assert_eq!(shaded.evals[0].result.bypassed_cell_count, 1);
    }

    #[test]
    fn invalid_scenario_is_rejected_before_evaluation() {
        let mut scenario = Scenario::demo(2, CellPreset::Mono);
        scenario.default_preset = "nope".to_string();
        let err = run_scenario(scenario, &PresetTable::default(), None, SweepOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
