//! Day sweep: sun geometry + moving shadow driving repeated evaluations.
//!
//! Time is local solar time (solar noon at 12:00); the sun position uses the
//! Spencer declination and the hour angle. The plane-of-array factor is the
//! cosine of the incidence angle, clamped at zero, and clear-sky attenuation
//! follows the air mass: `0.7^(AM^0.678)` with `AM = 1 / sin(elevation)`.
//! A cell's irradiance at a tick is `poa × atmosphere × static irradiance × shadow`.
//!
//! With `headings > 1` the panel azimuth is rotated through evenly spaced
//! headings at every tick (a panel on a vehicle that may be parked any way
//! round); power and energy for the tick are the mean over the headings.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{PresetTable, Scenario, SweepOptions};
use crate::error::AppError;
use crate::sim::{EnergyLedger, evaluate_scenario, total_power};

const DEG: f64 = PI / 180.0;
const MINUTES_PER_DAY: u32 = 24 * 60;
const MAX_HEADINGS: u32 = 360;

/// A shadow travelling across the cell indices during part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingShadow {
    pub start_hour: f64,
    pub end_hour: f64,
    /// Width of the shadow, in cells.
    pub width_cells: f64,
    /// Fraction of light removed under the shadow (0..=1).
    pub depth: f64,
}

impl MovingShadow {
    /// Light factor for cell `index` of `n_cells` at `hour`.
    pub fn factor(&self, hour: f64, index: usize, n_cells: usize) -> f64 {
        if !(self.start_hour..=self.end_hour).contains(&hour) || self.end_hour <= self.start_hour {
            return 1.0;
        }
        let progress = (hour - self.start_hour) / (self.end_hour - self.start_hour);
        // Leading edge enters at index 0 and leaves past the last cell.
        let lead = progress * (n_cells as f64 + self.width_cells);
        let trail = lead - self.width_cells;
        let centre = index as f64 + 0.5;
        if centre >= trail && centre < lead {
            1.0 - self.depth.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayConfig {
    pub date: NaiveDate,
    pub latitude_deg: f64,
    /// Panel tilt from horizontal.
    pub tilt_deg: f64,
    /// Panel azimuth, degrees clockwise from north (180 = south-facing).
    pub azimuth_deg: f64,
    pub step_minutes: u32,
    /// Panel headings averaged per tick (1 = fixed azimuth).
    #[serde(default = "default_headings")]
    pub headings: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<MovingShadow>,
}

fn default_headings() -> u32 {
    1
}

impl DayConfig {
    /// South-facing 30° panel at 45° N, 15-minute ticks, fixed heading.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            latitude_deg: 45.0,
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
            step_minutes: 15,
            headings: 1,
            shadow: None,
        }
    }

    /// Panel azimuth for heading `k` of `headings`.
    pub fn heading_azimuth(&self, k: u32) -> f64 {
        let step = 360.0 / self.headings.max(1) as f64;
        (self.azimuth_deg + k as f64 * step).rem_euclid(360.0)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.latitude_deg.is_finite() && (-90.0..=90.0).contains(&self.latitude_deg)) {
            return Err(AppError::new(2, "Latitude must be within [-90, 90] degrees."));
        }
        if !(self.tilt_deg.is_finite() && (0.0..=90.0).contains(&self.tilt_deg)) {
            return Err(AppError::new(2, "Tilt must be within [0, 90] degrees."));
        }
        if !self.azimuth_deg.is_finite() {
            return Err(AppError::new(2, "Azimuth must be finite."));
        }
        if self.step_minutes == 0 || self.step_minutes > MINUTES_PER_DAY {
            return Err(AppError::new(2, "Step must be between 1 and 1440 minutes."));
        }
        if self.headings == 0 || self.headings > MAX_HEADINGS {
            return Err(AppError::new(2, format!("Headings must be between 1 and {MAX_HEADINGS}.")));
        }
        if let Some(s) = &self.shadow {
            let finite = [s.start_hour, s.end_hour, s.width_cells, s.depth]
                .iter()
                .all(|v| v.is_finite());
            if !finite || s.end_hour <= s.start_hour || s.width_cells <= 0.0 {
                return Err(AppError::new(
                    2,
                    "Shadow needs start < end hours and a positive width.",
                ));
            }
            if !(0.0..=1.0).contains(&s.depth) {
                return Err(AppError::new(2, "Shadow depth must be within [0, 1]."));
            }
        }
        Ok(())
    }
}

/// Sun position at a local solar hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub elevation_deg: f64,
    /// Degrees clockwise from north.
    pub azimuth_deg: f64,
}

/// Spencer (1971) solar declination in degrees.
pub fn declination_deg(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year.max(1) as f64 - 1.0) / 365.0;
    (0.006918 - 0.399912 * b.cos() + 0.070257 * b.sin() - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin())
        / DEG
}

pub fn sun_position(latitude_deg: f64, day_of_year: u32, solar_hour: f64) -> SunPosition {
    let decl = declination_deg(day_of_year) * DEG;
    let lat = latitude_deg * DEG;
    let omega_deg = 15.0 * (solar_hour - 12.0);
    let omega = omega_deg * DEG;

    let sin_alpha = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let alpha = sin_alpha.asin();

    let denom = alpha.cos() * lat.cos();
    let cos_az = if denom.abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / denom
    } else {
        // Zenith or pole: azimuth is undefined, pick due south.
        -1.0
    };
    let az_abs = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth_deg = if omega_deg > 0.0 { 360.0 - az_abs } else { az_abs };

    SunPosition {
        elevation_deg: alpha / DEG,
        azimuth_deg,
    }
}

/// Cosine of the incidence angle on the panel, clamped at zero (and zero at night).
pub fn plane_of_array_factor(sun: SunPosition, tilt_deg: f64, panel_azimuth_deg: f64) -> f64 {
    if sun.elevation_deg <= 0.0 {
        return 0.0;
    }
    let alpha = sun.elevation_deg * DEG;
    let tilt = tilt_deg * DEG;
    let az_diff = (sun.azimuth_deg - panel_azimuth_deg) * DEG;
    (alpha.sin() * tilt.cos() + alpha.cos() * tilt.sin() * az_diff.cos()).max(0.0)
}

/// Clear-sky transmittance for the sun at `elevation_deg` (0 below the horizon).
pub fn atmospheric_factor(elevation_deg: f64) -> f64 {
    if !(elevation_deg > 0.0) {
        return 0.0;
    }
    let air_mass = 1.0 / (elevation_deg * DEG).sin().max(0.01);
    0.7_f64.powf(air_mass.powf(0.678))
}

/// One tick of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayTick {
    pub minute: u32,
    /// Plane-of-array factor, averaged over the headings.
    pub poa: f64,
    pub atmosphere: f64,
    /// String power summed over strings, averaged over the headings (W).
    pub power_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub ledger: EnergyLedger,
    pub peak_power_w: f64,
    pub peak_time: Option<NaiveTime>,
    /// Hours with the sun above the horizon.
    pub daylight_hours: f64,
    /// Energy divided by daylight hours (W).
    pub average_power_w: f64,
    pub ticks: Vec<DayTick>,
    /// True when the sweep stopped early on request.
    pub cancelled: bool,
}

/// Scenario with irradiance scaled by `light` and the moving shadow at `hour`.
pub fn scenario_at(scenario: &Scenario, cfg: &DayConfig, light: f64, hour: f64) -> Scenario {
    let mut at = scenario.clone();
    let n = at.cells.len();
    for (i, cell) in at.cells.iter_mut().enumerate() {
        let shadow = cfg.shadow.map(|s| s.factor(hour, i, n)).unwrap_or(1.0);
        cell.irradiance = cell.irradiance_ratio() * light * shadow;
    }
    at
}

/// Sweep a whole day in `step_minutes` ticks.
///
/// `cancel` is checked before every heading evaluation; a cancelled sweep
/// returns what earlier ticks accumulated with `cancelled = true`.
pub fn run_day(
    scenario: &Scenario,
    presets: &PresetTable,
    cfg: &DayConfig,
    opts: SweepOptions,
    cancel: &AtomicBool,
) -> Result<DayReport, AppError> {
    cfg.validate()?;
    let presets = scenario.preset_table(presets);
    scenario.validate(&presets)?;

    let day_of_year = cfg.date.ordinal();
    let headings = cfg.headings as f64;
    let mut ledger = EnergyLedger::new(scenario.strings.len(), scenario.cells.len());
    let mut ticks = Vec::new();
    let mut peak: Option<(f64, u32)> = None;
    let mut daylight_hours = 0.0;
    let mut cancelled = false;

    let mut minute = 0;
    'day: while minute < MINUTES_PER_DAY {
        let dt_hours = cfg.step_minutes.min(MINUTES_PER_DAY - minute) as f64 / 60.0;
        let hour = minute as f64 / 60.0;
        let sun = sun_position(cfg.latitude_deg, day_of_year, hour);
        let atmosphere = atmospheric_factor(sun.elevation_deg);

        let mut runs = Vec::new();
        let mut poa_sum = 0.0;
        for k in 0..cfg.headings {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break 'day;
            }
            if atmosphere <= 0.0 {
                break;
            }
            let poa = plane_of_array_factor(sun, cfg.tilt_deg, cfg.heading_azimuth(k));
            poa_sum += poa;
            runs.push(if poa > 0.0 {
                evaluate_scenario(&scenario_at(scenario, cfg, poa * atmosphere, hour), &presets, opts)
            } else {
                Vec::new()
            });
        }

        let poa = poa_sum / headings;
        let power_w = runs.iter().map(|evals| total_power(evals)).sum::<f64>() / headings;
        ledger.record_mean(minute / 60, &runs, dt_hours);
        if sun.elevation_deg > 0.0 {
            daylight_hours += dt_hours;
        }
        debug!(minute, poa, atmosphere, power_w, "day tick");

        if power_w > 0.0 && peak.is_none_or(|(p, _)| power_w > p) {
            peak = Some((power_w, minute));
        }
        ticks.push(DayTick {
            minute,
            poa,
            atmosphere,
            power_w,
        });
        minute += cfg.step_minutes;
    }

    let (peak_power_w, peak_time) = match peak {
        Some((p, m)) => (p, NaiveTime::from_num_seconds_from_midnight_opt(m * 60, 0)),
        None => (0.0, None),
    };
    let average_power_w = if daylight_hours > 0.0 {
        ledger.total_wh / daylight_hours
    } else {
        0.0
    };

    info!(
        date = %cfg.date,
        total_wh = ledger.total_wh,
        average_power_w,
        ticks = ticks.len(),
        cancelled,
        "day sweep finished"
    );

    Ok(DayReport {
        date: cfg.date,
        ledger,
        peak_power_w,
        peak_time,
        daylight_hours,
        average_power_w,
        ticks,
        cancelled,
    })
}
