//! Scenario description: cells, strings and their bypass wiring.
//!
//! Cells are owned by the scenario and referenced by their stable index; each
//! string owns an ordered list of those indices, so evaluating a string never
//! rescans the cell table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CellParams, CellPreset, SegmentBypass, grouped_segments, nested_segments};
use crate::error::AppError;

/// One cell in the installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    /// Preset name; falls back to the scenario default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Effective irradiance ratio reaching the cell (0 = dark, 1 = full sun).
    pub irradiance: f64,
}

impl CellSpec {
    pub fn lit(irradiance: f64) -> Self {
        Self {
            preset: None,
            irradiance,
        }
    }

    /// Irradiance clamped into `[0, 1]`, with non-finite values treated as dark.
    pub fn irradiance_ratio(&self) -> f64 {
        if self.irradiance.is_finite() {
            self.irradiance.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Bypass wiring of one string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BypassTopology {
    /// No bypass diodes at all.
    None,
    /// One diode per cell; `mask` selects which positions carry one (all when absent).
    PerCell {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mask: Option<Vec<bool>>,
    },
    /// Explicit, possibly overlapping diode segments.
    Segments { segments: Vec<SegmentBypass> },
}

impl BypassTopology {
    /// Short label for reports.
    pub fn label(&self) -> String {
        match self {
            BypassTopology::None => "none".to_string(),
            BypassTopology::PerCell { mask: None } => "per-cell".to_string(),
            BypassTopology::PerCell { mask: Some(m) } => {
                format!("per-cell ({}/{})", m.iter().filter(|&&b| b).count(), m.len())
            }
            BypassTopology::Segments { segments } => format!("segments ({})", segments.len()),
        }
    }
}

/// An ordered series string of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLayout {
    pub name: String,
    /// Indices into `Scenario::cells`, in electrical order.
    pub cells: Vec<usize>,
    pub bypass: BypassTopology,
    /// Overrides the preset's bypass-diode drop for `per_cell` wiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_drop: Option<f64>,
}

/// Complete simulation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub default_preset: String,
    /// Additional named presets (shadow built-ins of the same name).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, CellParams>,
    pub cells: Vec<CellSpec>,
    pub strings: Vec<StringLayout>,
}

/// Name → parameters lookup combining built-in and custom presets.
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    custom: BTreeMap<String, CellParams>,
}

impl PresetTable {
    pub fn new(custom: BTreeMap<String, CellParams>) -> Self {
        Self { custom }
    }

    /// Merge further presets in; later entries win.
    pub fn extend(&mut self, more: &BTreeMap<String, CellParams>) {
        for (k, v) in more {
            self.custom.insert(k.clone(), *v);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<CellParams> {
        self.custom
            .get(name)
            .copied()
            .or_else(|| CellPreset::from_name(name).map(CellPreset::params))
    }

    /// All names this table can resolve (custom first, then built-ins).
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.custom.keys().cloned().collect();
        for p in CellPreset::ALL {
            if !self.custom.contains_key(p.name()) {
                out.push(p.name().to_string());
            }
        }
        out
    }
}

impl Scenario {
    /// Preset table for this scenario layered over `base`.
    pub fn preset_table(&self, base: &PresetTable) -> PresetTable {
        let mut table = base.clone();
        table.extend(&self.presets);
        table
    }

    /// Parameters for cell `index` (default preset when the cell names none).
    pub fn cell_params(&self, presets: &PresetTable, index: usize) -> Option<CellParams> {
        let cell = self.cells.get(index)?;
        let name = cell.preset.as_deref().unwrap_or(&self.default_preset);
        presets.resolve(name)
    }

    /// Check indices, presets, masks and numeric fields.
    pub fn validate(&self, presets: &PresetTable) -> Result<(), AppError> {
        if presets.resolve(&self.default_preset).is_none() {
            return Err(AppError::new(
                3,
                format!("Unknown default preset '{}'.", self.default_preset),
            ));
        }
        for (name, p) in &self.presets {
            if !p.is_physical() {
                return Err(AppError::new(
                    3,
                    format!("Preset '{name}' has negative or non-finite parameters."),
                ));
            }
        }
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(name) = &cell.preset {
                if presets.resolve(name).is_none() {
                    return Err(AppError::new(3, format!("Cell {i}: unknown preset '{name}'.")));
                }
            }
            if !cell.irradiance.is_finite() {
                return Err(AppError::new(3, format!("Cell {i}: irradiance must be finite.")));
            }
        }
        for s in &self.strings {
            if let Some(&bad) = s.cells.iter().find(|&&c| c >= self.cells.len()) {
                return Err(AppError::new(
                    3,
                    format!(
                        "String '{}': cell index {bad} out of range (scenario has {} cells).",
                        s.name,
                        self.cells.len()
                    ),
                ));
            }
            if let BypassTopology::PerCell { mask: Some(mask) } = &s.bypass {
                if mask.len() != s.cells.len() {
                    return Err(AppError::new(
                        3,
                        format!(
                            "String '{}': bypass mask has {} entries for {} cells.",
                            s.name,
                            mask.len(),
                            s.cells.len()
                        ),
                    ));
                }
            }
            if let Some(drop) = s.bypass_drop {
                if !drop.is_finite() || drop < 0.0 {
                    return Err(AppError::new(
                        3,
                        format!("String '{}': bypass_drop must be finite and >= 0.", s.name),
                    ));
                }
            }
            if let BypassTopology::Segments { segments } = &s.bypass {
                if let Some(seg) = segments.iter().find(|seg| !seg.voltage_drop.is_finite()) {
                    return Err(AppError::new(
                        3,
                        format!(
                            "String '{}': segment {}..={} has a non-finite drop.",
                            s.name, seg.start_index, seg.end_index
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Demo installation: two strings sharing one preset.
    ///
    /// The first string carries one diode per cell; the second uses nested
    /// per-cell and per-group diodes, mirroring common module hardware.
    pub fn demo(cells_per_string: usize, preset: CellPreset) -> Self {
        let n = cells_per_string.max(1);
        let drop = preset.params().bypass_drop;
        let cells = vec![CellSpec::lit(1.0); 2 * n];
        let group = n.div_ceil(3).max(1);

        let strings = vec![
            StringLayout {
                name: "A".to_string(),
                cells: (0..n).collect(),
                bypass: BypassTopology::PerCell { mask: None },
                bypass_drop: None,
            },
            StringLayout {
                name: "B".to_string(),
                cells: (n..2 * n).collect(),
                bypass: BypassTopology::Segments {
                    segments: if n > 1 {
                        nested_segments(n, group, drop)
                    } else {
                        grouped_segments(n, 1, drop)
                    },
                },
                bypass_drop: None,
            },
        ];

        Self {
            name: format!("demo-{}", preset.name()),
            default_preset: preset.name().to_string(),
            presets: BTreeMap::new(),
            cells,
            strings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_validates() {
        let s = Scenario::demo(6, CellPreset::Mono);
        assert_eq!(s.cells.len(), 12);
        assert_eq!(s.strings.len(), 2);
        s.validate(&PresetTable::default()).unwrap();
    }

    #[test]
    fn out_of_range_cell_index_is_rejected() {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        s.strings[0].cells.push(99);
        let err = s.validate(&PresetTable::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("99"));
    }

    #[test]
    fn mask_length_must_match() {
        let mut s = Scenario::demo(3, CellPreset::Mono);
        s.strings[0].bypass = BypassTopology::PerCell {
            mask: Some(vec![true]),
        };
        assert!(s.validate(&PresetTable::default()).is_err());
    }

    #[test]
    fn custom_presets_shadow_builtins() {
        let mut custom = BTreeMap::new();
        let mut p = CellPreset::Mono.params();
        p.isc = 3.0;
        custom.insert("mono".to_string(), p);
        let table = PresetTable::new(custom);
        assert_eq!(table.resolve("mono").unwrap().isc, 3.0);
        assert_eq!(table.resolve("poly"), Some(CellPreset::Poly.params()));
        assert_eq!(table.names().iter().filter(|n| *n == "mono").count(), 1);
    }

    #[test]
    fn unknown_cell_preset_is_rejected() {
        let mut s = Scenario::demo(2, CellPreset::Poly);
        s.cells[1].preset = Some("unobtainium".to_string());
        assert!(s.validate(&PresetTable::default()).is_err());
    }

    #[test]
    fn irradiance_ratio_is_clamped() {
        assert_eq!(CellSpec::lit(1.4).irradiance_ratio(), 1.0);
        assert_eq!(CellSpec::lit(-0.2).irradiance_ratio(), 0.0);
        assert_eq!(CellSpec::lit(f64::NAN).irradiance_ratio(), 0.0);
    }
}
