//! Shared bookkeeping for current sweeps over a string.
//!
//! Both aggregators sweep the string current upward from `0`, compute the raw
//! (unclamped) string voltage per sample and hand it to `SweepRecorder`, which
//! clamps, remembers the first infeasible sample and finally extracts the
//! maximum-power operating point.

use tracing::trace;

use crate::domain::IvTrace;

/// Operating point picked from a finished sweep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OperatingPoint {
    pub power: f64,
    pub voltage: f64,
    pub current: f64,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// String curve, re-ordered so current is non-increasing.
    pub trace: IvTrace,
    pub operating: OperatingPoint,
    /// Sweep index of the first sample whose raw total was negative.
    pub first_negative: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SweepRecorder {
    current: Vec<f64>,
    voltage: Vec<f64>,
    first_negative: Option<usize>,
}

impl SweepRecorder {
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            current: Vec::with_capacity(samples),
            voltage: Vec::with_capacity(samples),
            first_negative: None,
        }
    }

    /// Record one sample. Negative, infinite-negative and NaN totals clamp to `0`.
    pub fn record(&mut self, current: f64, raw_voltage: f64) {
        let feasible = raw_voltage >= 0.0;
        if !feasible && self.first_negative.is_none() {
            self.first_negative = Some(self.current.len());
        }
        self.current.push(current);
        self.voltage.push(if feasible { raw_voltage } else { 0.0 });
    }

    pub fn finish(self) -> SweepOutcome {
        let n = self.current.len();
        let cutoff = self.first_negative.unwrap_or(n);

        // Samples at or past the first negative total cannot be sustained
        // even with every diode engaged; they never qualify as the MPP.
        let mut operating = OperatingPoint::default();
        for k in 0..cutoff {
            let p = self.current[k] * self.voltage[k];
            if p > operating.power {
                operating = OperatingPoint {
                    power: p,
                    voltage: self.voltage[k],
                    current: self.current[k],
                };
            }
        }
        trace!(
            samples = n,
            cutoff,
            power = operating.power,
            "sweep finished"
        );

        let voc = self.voltage.first().copied().unwrap_or(0.0);
        let isc = self
            .voltage
            .iter()
            .position(|&v| v <= 0.0)
            .map(|k| self.current[k])
            .or_else(|| self.current.last().copied())
            .unwrap_or(0.0);

        let mut current = self.current;
        let mut voltage = self.voltage;
        current.reverse();
        voltage.reverse();

        SweepOutcome {
            trace: IvTrace {
                current,
                voltage,
                voc,
                isc,
                vmp: operating.voltage,
                imp: operating.current,
            },
            operating,
            first_negative: self.first_negative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpp_ignores_samples_past_first_negative() {
        let mut rec = SweepRecorder::with_capacity(4);
        rec.record(0.0, 3.0);
        rec.record(1.0, 2.0);
        rec.record(2.0, -0.5);
        // Would win if it were allowed.
        rec.record(3.0, 5.0);
        let out = rec.finish();
        assert_eq!(out.first_negative, Some(2));
        assert_eq!(out.operating.current, 1.0);
        assert_eq!(out.operating.voltage, 2.0);
    }

    #[test]
    fn trace_is_reordered_and_clamped() {
        let mut rec = SweepRecorder::with_capacity(3);
        rec.record(0.0, 1.5);
        rec.record(1.0, 1.0);
        rec.record(2.0, f64::NEG_INFINITY);
        let out = rec.finish();
        assert_eq!(out.trace.current, vec![2.0, 1.0, 0.0]);
        assert_eq!(out.trace.voltage, vec![0.0, 1.0, 1.5]);
        assert_eq!(out.trace.voc, 1.5);
        assert_eq!(out.trace.isc, 2.0);
    }

    #[test]
    fn nan_totals_count_as_infeasible() {
        let mut rec = SweepRecorder::default();
        rec.record(0.0, f64::NAN);
        let out = rec.finish();
        assert_eq!(out.first_negative, Some(0));
        assert_eq!(out.operating, OperatingPoint::default());
    }
}
