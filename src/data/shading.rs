//! Synthetic shading patterns.
//!
//! Patterns produce a per-cell irradiance vector for one string. `severity`
//! is the fraction of light removed at the darkest point (0 = none, 1 = dark).
//! The random pattern is seeded so a given seed always produces the same sky.

use clap::ValueEnum;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Beta;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Scenario;
use crate::error::AppError;

/// Shape parameters of the random-shade draw; skewed towards light shade with a
/// long tail of heavy shade (leaves, bird droppings, chimney shadows).
const RANDOM_ALPHA: f64 = 2.0;
const RANDOM_BETA: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShadingPattern {
    /// Full sun everywhere.
    #[default]
    None,
    /// One shaded cell in the middle of the string.
    Single,
    /// The first half of the string is shaded.
    Half,
    /// Linear ramp from full sun to the shaded level along the string.
    Gradient,
    /// Independent Beta-distributed shade per cell.
    Random,
}

impl ShadingPattern {
    pub fn name(self) -> &'static str {
        match self {
            ShadingPattern::None => "none",
            ShadingPattern::Single => "single",
            ShadingPattern::Half => "half",
            ShadingPattern::Gradient => "gradient",
            ShadingPattern::Random => "random",
        }
    }
}

/// Irradiance ratios for a string of `n_cells` cells.
pub fn pattern_irradiance(
    pattern: ShadingPattern,
    n_cells: usize,
    severity: f64,
    seed: u64,
) -> Result<Vec<f64>, AppError> {
    let severity = if severity.is_finite() { severity.clamp(0.0, 1.0) } else { 0.0 };
    let shaded = 1.0 - severity;

    let out = match pattern {
        ShadingPattern::None => vec![1.0; n_cells],
        ShadingPattern::Single => {
            let mut v = vec![1.0; n_cells];
            if let Some(mid) = v.get_mut(n_cells / 2) {
                *mid = shaded;
            }
            v
        }
        ShadingPattern::Half => (0..n_cells)
            .map(|i| if i < n_cells / 2 { shaded } else { 1.0 })
            .collect(),
        ShadingPattern::Gradient => {
            let last = n_cells.saturating_sub(1).max(1) as f64;
            (0..n_cells)
                .map(|i| 1.0 - severity * (i as f64 / last))
                .collect()
        }
        ShadingPattern::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            let beta = Beta::new(RANDOM_ALPHA, RANDOM_BETA)
                .map_err(|e| AppError::new(4, format!("Shade distribution error: {e}")))?;
            (0..n_cells)
                .map(|_| 1.0 - severity * beta.sample(&mut rng))
                .collect()
        }
    };
    Ok(out)
}

/// Apply `pattern` to every string of `scenario` (each string gets its own
/// stream for the random pattern). Cells shared by two strings take the later value.
pub fn apply_pattern(
    scenario: &mut Scenario,
    pattern: ShadingPattern,
    severity: f64,
    seed: u64,
) -> Result<(), AppError> {
    for (s, layout) in scenario.strings.iter().enumerate() {
        let values = pattern_irradiance(pattern, layout.cells.len(), severity, seed.wrapping_add(s as u64))?;
        for (&idx, value) in layout.cells.iter().zip(values) {
            if let Some(cell) = scenario.cells.get_mut(idx) {
                cell.irradiance = value;
            }
        }
    }
    debug!(pattern = pattern.name(), severity, seed, "shading applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellPreset;

    #[test]
    fn deterministic_patterns_have_expected_shape() {
        assert_eq!(pattern_irradiance(ShadingPattern::None, 3, 0.9, 0).unwrap(), vec![1.0; 3]);
        assert_eq!(
            pattern_irradiance(ShadingPattern::Single, 5, 0.75, 0).unwrap(),
            vec![1.0, 1.0, 0.25, 1.0, 1.0]
        );
        assert_eq!(
            pattern_irradiance(ShadingPattern::Half, 4, 1.0, 0).unwrap(),
            vec![0.0, 0.0, 1.0, 1.0]
        );
        let g = pattern_irradiance(ShadingPattern::Gradient, 5, 0.8, 0).unwrap();
        assert_eq!(g[0], 1.0);
        assert!((g[4] - 0.2).abs() < 1e-12);
        assert!(g.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn random_is_reproducible_per_seed() {
        let a = pattern_irradiance(ShadingPattern::Random, 16, 0.9, 42).unwrap();
        let b = pattern_irradiance(ShadingPattern::Random, 16, 0.9, 42).unwrap();
        let c = pattern_irradiance(ShadingPattern::Random, 16, 0.9, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|v| (0.1..=1.0).contains(v)));
    }

    #[test]
    fn severity_is_clamped() {
        let v = pattern_irradiance(ShadingPattern::Half, 2, 7.0, 0).unwrap();
        assert_eq!(v, vec![0.0, 1.0]);
        let v = pattern_irradiance(ShadingPattern::Single, 1, f64::NAN, 0).unwrap();
        assert_eq!(v, vec![1.0]);
        assert!(pattern_irradiance(ShadingPattern::Gradient, 0, 0.5, 0).unwrap().is_empty());
    }

    #[test]
    fn apply_pattern_writes_each_string() {
        let mut s = Scenario::demo(4, CellPreset::Mono);
        apply_pattern(&mut s, ShadingPattern::Half, 0.5, 1).unwrap();
        let irr: Vec<f64> = s.cells.iter().map(|c| c.irradiance).collect();
        assert_eq!(irr, vec![0.5, 0.5, 1.0, 1.0, 0.5, 0.5, 1.0, 1.0]);
    }
}
