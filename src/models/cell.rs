//! Single-diode cell model.
//!
//! The cell curve is sampled on a uniform voltage grid from `0` to the
//! irradiance-adjusted open-circuit voltage:
//!
//! ```text
//! Iph  = Isc * G
//! Voc' = Voc + n * Vt * ln(G)                  (clamped >= 0)
//! I(V) = Iph * (1 - exp((V - Voc') / (n * Vt))) (clamped to [0, Iph])
//! ```
//!
//! followed by a first-order series-resistance correction `V -= I * Rs`.
//! The cell temperature is fixed at 25 °C, so `Vt` is a constant.
//!
//! Numerical notes:
//! - The shift is applied after sampling on the voltage grid. Low-voltage samples
//!   whose `I * Rs` exceeds `V` collapse onto `0`, so the voltage array is only
//!   non-decreasing, not strictly increasing.
//! - The exponent is clamped before `exp` to avoid overflow.
//! - At or below `DARK_EPSILON` the cell is dark. Below `VOC_LOG_FLOOR` the
//!   open-circuit voltage keeps its full-sun value instead of following `ln(G)`.

use crate::domain::{CellParams, IvTrace, SweepOptions};
use crate::math::linspace;

/// Thermal voltage at 25 °C (V).
pub const THERMAL_VOLTAGE: f64 = 0.026;

/// Irradiance ratios at or below this are treated as fully dark.
pub const DARK_EPSILON: f64 = 0.001;

/// Irradiance ratio below which `Voc` is not log-adjusted.
pub const VOC_LOG_FLOOR: f64 = 0.01;

/// Upper bound on the diode exponent.
const EXP_CLAMP: f64 = 20.0;

/// Guards `n * Vt` against zero or negative ideality factors.
const MIN_NVT: f64 = 1e-9;

/// Build the IV trace of one cell at the given irradiance ratio.
pub fn build_cell_trace(params: &CellParams, irradiance_ratio: f64, opts: SweepOptions) -> IvTrace {
    if !(irradiance_ratio.is_finite() && irradiance_ratio > DARK_EPSILON) {
        return IvTrace::dark();
    }
    let ratio = irradiance_ratio.min(1.0);

    let n_vt = (params.ideality * THERMAL_VOLTAGE).max(MIN_NVT);
    let iph = (params.isc * ratio).max(0.0);
    let voc = if ratio > VOC_LOG_FLOOR {
        (params.voc + n_vt * ratio.ln()).max(0.0)
    } else {
        params.voc.max(0.0)
    };
    let rs = params.series_resistance.max(0.0);

    let voltage_grid = linspace(0.0, voc, opts.samples.max(2));
    let mut current = Vec::with_capacity(voltage_grid.len());
    let mut voltage = Vec::with_capacity(voltage_grid.len());

    let mut best_power = f64::NEG_INFINITY;
    let (mut vmp, mut imp) = (0.0, 0.0);

    for v in voltage_grid {
        let exponent = ((v - voc) / n_vt).min(EXP_CLAMP);
        let i = (iph * (1.0 - exponent.exp())).clamp(0.0, iph);
        let v = if i > 0.0 { (v - i * rs).max(0.0) } else { v };

        let p = v * i;
        if p > best_power {
            best_power = p;
            vmp = v;
            imp = i;
        }

        current.push(i);
        voltage.push(v);
    }

    IvTrace {
        current,
        voltage,
        voc,
        isc: iph,
        vmp,
        imp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellPreset;

    fn mono() -> CellParams {
        CellPreset::Mono.params()
    }

    #[test]
    fn dark_cell_is_all_zero() {
        let t = build_cell_trace(&mono(), 0.0, SweepOptions::default());
        assert_eq!(t.isc, 0.0);
        assert_eq!(t.voc, 0.0);
        assert_eq!(t.len(), 2);
        assert!(t.current.iter().chain(t.voltage.iter()).all(|&v| v == 0.0));
    }

    #[test]
    fn below_epsilon_and_nan_count_as_dark() {
        assert_eq!(build_cell_trace(&mono(), 1e-9, SweepOptions::default()), IvTrace::dark());
        assert_eq!(build_cell_trace(&mono(), DARK_EPSILON, SweepOptions::default()), IvTrace::dark());
        assert_eq!(build_cell_trace(&mono(), f64::NAN, SweepOptions::default()), IvTrace::dark());
    }

    #[test]
    fn build_is_deterministic() {
        let a = build_cell_trace(&mono(), 0.73, SweepOptions::default());
        let b = build_cell_trace(&mono(), 0.73, SweepOptions::default());
        assert_eq!(a.current.len(), b.current.len());
        for (x, y) in a.current.iter().zip(&b.current) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        for (x, y) in a.voltage.iter().zip(&b.voltage) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn recorded_mpp_is_true_sample_maximum() {
        let p = mono();
        let t = build_cell_trace(&p, 1.0, SweepOptions::default());
        let max_sample = t
            .voltage
            .iter()
            .zip(&t.current)
            .map(|(v, i)| v * i)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(t.pmax(), max_sample);
        assert!(t.vmp > 0.0 && t.vmp < t.voc);
        assert!(t.imp > 0.0 && t.imp < t.isc);
        assert!(t.voc <= p.voc + 1e-12);
    }

    #[test]
    fn full_sun_keeps_stc_voc_and_isc() {
        let p = mono();
        let t = build_cell_trace(&p, 1.0, SweepOptions::default());
        assert!((t.voc - p.voc).abs() < 1e-12);
        assert!((t.isc - p.isc).abs() < 1e-12);
        assert_eq!(*t.current.last().unwrap(), 0.0);
        assert!((*t.voltage.last().unwrap() - p.voc).abs() < 1e-12);
    }

    #[test]
    fn shading_lowers_voc_logarithmically() {
        let p = mono();
        let half = build_cell_trace(&p, 0.5, SweepOptions::default());
        let expected = p.voc + p.ideality * THERMAL_VOLTAGE * 0.5f64.ln();
        assert!((half.voc - expected).abs() < 1e-12);
        assert!((half.isc - 0.5 * p.isc).abs() < 1e-12);
    }

    #[test]
    fn currents_stay_within_photocurrent() {
        let t = build_cell_trace(&CellPreset::ThinFilm.params(), 0.4, SweepOptions::new(57));
        assert_eq!(t.len(), 57);
        assert!(t.current.iter().all(|&i| (0.0..=t.isc).contains(&i)));
        assert!(t.voltage.iter().all(|&v| v >= 0.0));
        assert!(t.current.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn interpolation_round_trip_within_one_step() {
        let t = build_cell_trace(&mono(), 1.0, SweepOptions::default());
        let step = t.voc / (t.len() as f64 - 1.0);
        for k in 1..20 {
            let v = t.voc * k as f64 / 20.0;
            let back = t.voltage_at(t.current_at(v));
            assert!((back - v).abs() <= step, "v={v} back={back}");
        }
    }

    #[test]
    fn very_dim_cells_keep_the_full_sun_voc() {
        let p = mono();
        let dim = build_cell_trace(&p, 0.005, SweepOptions::default());
        assert_eq!(dim.voc, p.voc);
        assert!((dim.isc - 0.005 * p.isc).abs() < 1e-12);

        let lit = build_cell_trace(&p, 0.02, SweepOptions::default());
        assert!(lit.voc < p.voc);
    }
}
