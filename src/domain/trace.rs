//! Sampled current–voltage curve for one device (cell or string).

use serde::{Deserialize, Serialize};

use crate::math::{Direction, interpolate};

/// A sampled IV curve.
///
/// `current` and `voltage` are parallel: index `k` is one operating point.
/// Current is non-increasing and voltage is non-decreasing along the index.
///
/// The summary scalars are derived while the trace is built and are not
/// guaranteed to equal the first/last samples (the series-resistance shift
/// moves voltages after the curve is sampled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvTrace {
    pub current: Vec<f64>,
    pub voltage: Vec<f64>,
    /// Open-circuit voltage (V).
    pub voc: f64,
    /// Short-circuit current (A).
    pub isc: f64,
    /// Voltage at maximum power (V).
    pub vmp: f64,
    /// Current at maximum power (A).
    pub imp: f64,
}

impl IvTrace {
    /// Degenerate two-sample all-zero trace (dark cell, empty string).
    pub fn dark() -> Self {
        Self {
            current: vec![0.0, 0.0],
            voltage: vec![0.0, 0.0],
            voc: 0.0,
            isc: 0.0,
            vmp: 0.0,
            imp: 0.0,
        }
    }

    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.current.len().min(self.voltage.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Power at the recorded maximum-power point.
    pub fn pmax(&self) -> f64 {
        self.vmp * self.imp
    }

    /// Voltage the device sustains while carrying `current`.
    pub fn voltage_at(&self, current: f64) -> f64 {
        interpolate(&self.current, &self.voltage, current, Direction::Descending)
    }

    /// Current the device delivers at terminal `voltage`.
    pub fn current_at(&self, voltage: f64) -> f64 {
        interpolate(&self.voltage, &self.current, voltage, Direction::Ascending)
    }

    /// `(voltage, current)` pairs in sample order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.voltage.iter().copied().zip(self.current.iter().copied())
    }

    /// `(voltage, power)` pairs in sample order.
    pub fn power_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points().map(|(v, i)| (v, v * i))
    }
}
