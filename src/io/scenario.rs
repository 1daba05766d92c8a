//! Read/write scenario and preset JSON files.
//!
//! A scenario file is the portable description of an installation:
//! - default + custom cell presets
//! - per-cell irradiance ratios
//! - strings with their bypass wiring
//!
//! The schema is defined by `domain::Scenario`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::domain::{CellParams, PresetTable, Scenario};
use crate::error::AppError;

/// Read a scenario JSON file and validate it against `presets`.
pub fn read_scenario_json(path: &Path, presets: &PresetTable) -> Result<Scenario, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open scenario '{}': {e}", path.display())))?;
    let scenario: Scenario = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid scenario JSON '{}': {e}", path.display())))?;

    scenario.validate(&scenario.preset_table(presets))?;
    info!(
        path = %path.display(),
        cells = scenario.cells.len(),
        strings = scenario.strings.len(),
        "scenario loaded"
    );
    Ok(scenario)
}

/// Write a scenario JSON file (pretty-printed).
pub fn write_scenario_json(path: &Path, scenario: &Scenario) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create scenario '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, scenario)
        .map_err(|e| AppError::new(4, format!("Failed to write scenario JSON: {e}")))?;
    Ok(())
}

/// Read a `{ "name": CellParams, ... }` preset file.
///
/// Every preset must have finite, non-negative parameters.
pub fn read_presets_json(path: &Path) -> Result<BTreeMap<String, CellParams>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open presets '{}': {e}", path.display())))?;
    let presets: BTreeMap<String, CellParams> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid presets JSON '{}': {e}", path.display())))?;

    if let Some(name) = presets.iter().find(|(_, p)| !p.is_physical()).map(|(name, _)| name) {
        return Err(AppError::new(
            2,
            format!(
                "Preset '{name}' in '{}' has negative or non-finite parameters.",
                path.display()
            ),
        ));
    }
    info!(path = %path.display(), presets = presets.len(), "presets loaded");
    Ok(presets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BypassTopology, CellPreset};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pvs-{}-{name}", std::process::id()))
    }

    #[test]
    fn scenario_survives_write_and_read() {
        let path = temp_path("scenario.json");
        let mut s = Scenario::demo(4, CellPreset::Poly);
        s.cells[1].irradiance = 0.25;
        write_scenario_json(&path, &s).unwrap();
        let back = read_scenario_json(&path, &PresetTable::default()).unwrap();
        assert_eq!(back, s);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn hand_written_scenario_parses() {
        let path = temp_path("hand.json");
        let json = r#"{
            "name": "roof",
            "default_preset": "panel",
            "presets": {
                "panel": { "voc": 0.6, "isc": 5.0, "ideality": 1.3, "series_resistance": 0.01, "bypass_drop": 0.4 }
            },
            "cells": [ { "irradiance": 1.0 }, { "irradiance": 0.0, "preset": "mono" } ],
            "strings": [
                { "name": "s1", "cells": [0, 1], "bypass": { "kind": "per_cell" } },
                { "name": "s2", "cells": [1, 0], "bypass": { "kind": "none" } },
                { "name": "s3", "cells": [0, 1],
                  "bypass": { "kind": "segments", "segments": [ { "start_index": 0, "end_index": 1, "voltage_drop": 0.5 } ] } }
            ]
        }"#;
        std::fs::write(&path, json).unwrap();
        let s = read_scenario_json(&path, &PresetTable::default()).unwrap();
        assert_eq!(s.strings.len(), 3);
        assert_eq!(s.strings[0].bypass, BypassTopology::PerCell { mask: None });
        assert_eq!(s.cell_params(&s.preset_table(&PresetTable::default()), 0).unwrap().isc, 5.0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_scenario_reports_validation_error() {
        let path = temp_path("bad.json");
        let mut s = Scenario::demo(2, CellPreset::Mono);
        s.strings[0].cells = vec![0, 42];
        write_scenario_json(&path, &s).unwrap();
        let err = read_scenario_json(&path, &PresetTable::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = read_presets_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn preset_file_rejects_negative_parameters() {
        let path = temp_path("bad-presets.json");
        let json = r#"{
            "ok": { "voc": 0.6, "isc": 5.0, "ideality": 1.3, "series_resistance": 0.01, "bypass_drop": 0.4 },
            "mono": { "voc": 0.7, "isc": -5.0, "ideality": -1.0, "series_resistance": 0.004, "bypass_drop": 0.35 }
        }"#;
        std::fs::write(&path, json).unwrap();
        let err = read_presets_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("'mono'"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn preset_file_overrides_are_loaded() {
        let path = temp_path("presets.json");
        let json = r#"{ "mono": { "voc": 0.72, "isc": 9.5, "ideality": 1.2, "series_resistance": 0.004, "bypass_drop": 0.3 } }"#;
        std::fs::write(&path, json).unwrap();
        let presets = read_presets_json(&path).unwrap();
        assert_eq!(presets["mono"].isc, 9.5);
        let _ = std::fs::remove_file(path);
    }

}
