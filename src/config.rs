//! Environment-driven settings.
//!
//! `.env` is loaded once (via `dotenvy`) and then these variables are read:
//!
//! - `PVS_SAMPLES`: default sweep sample count (>= 2)
//! - `PVS_PRESETS`: optional JSON file with extra / overridden cell presets
//!
//! CLI flags take precedence over anything configured here.

use std::path::PathBuf;

use tracing::debug;

use crate::domain::{DEFAULT_SAMPLES, MIN_SAMPLES, PresetTable, SweepOptions};
use crate::error::AppError;

pub const ENV_SAMPLES: &str = "PVS_SAMPLES";
pub const ENV_PRESETS: &str = "PVS_PRESETS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub samples: usize,
    pub presets_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            presets_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a closure).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();

        if let Some(raw) = get(ENV_SAMPLES).filter(|v| !v.trim().is_empty()) {
            let samples: usize = raw.trim().parse().map_err(|_| {
                AppError::new(2, format!("{ENV_SAMPLES} must be a whole number, got '{raw}'."))
            })?;
            if samples < MIN_SAMPLES {
                return Err(AppError::new(
                    2,
                    format!("{ENV_SAMPLES} must be >= {MIN_SAMPLES}, got {samples}."),
                ));
            }
            settings.samples = samples;
        }

        settings.presets_path = get(ENV_PRESETS)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        debug!(samples = settings.samples, presets = ?settings.presets_path, "settings loaded");
        Ok(settings)
    }

    /// Sweep options, with an optional CLI override of the sample count.
    pub fn sweep(&self, samples_override: Option<usize>) -> SweepOptions {
        SweepOptions::new(samples_override.unwrap_or(self.samples))
    }

    /// Built-in presets plus anything from `PVS_PRESETS`.
    pub fn preset_table(&self) -> Result<PresetTable, AppError> {
        match &self.presets_path {
            Some(path) => Ok(PresetTable::new(crate::io::read_presets_json(path)?)),
            None => Ok(PresetTable::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_without_variables() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.sweep(None).samples, DEFAULT_SAMPLES);
        assert_eq!(s.sweep(Some(50)).samples, 50);
    }

    #[test]
    fn reads_samples_and_presets_path() {
        let s = Settings::from_lookup(lookup(&[(ENV_SAMPLES, " 400 "), (ENV_PRESETS, "cells.json")])).unwrap();
        assert_eq!(s.samples, 400);
        assert_eq!(s.presets_path, Some(PathBuf::from("cells.json")));
    }

    #[test]
    fn rejects_bad_sample_counts() {
        assert_eq!(
            Settings::from_lookup(lookup(&[(ENV_SAMPLES, "many")])).unwrap_err().exit_code(),
            2
        );
        assert!(Settings::from_lookup(lookup(&[(ENV_SAMPLES, "1")])).is_err());
    }

    #[test]
    fn unphysical_preset_file_fails_at_startup() {
        let path = std::env::temp_dir().join(format!("pvs-{}-env-presets.json", std::process::id()));
        let json = r#"{ "mono": { "voc": 0.7, "isc": -5.0, "ideality": -1.0, "series_resistance": 0.004, "bypass_drop": 0.35 } }"#;
        std::fs::write(&path, json).unwrap();
        let settings = Settings {
            presets_path: Some(path.clone()),
            ..Settings::default()
        };
        assert_eq!(settings.preset_table().unwrap_err().exit_code(), 2);
        let _ = std::fs::remove_file(path);
    }

}
