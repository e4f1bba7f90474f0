use crate::ephemeris::Body;
use crate::error::EngineError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Longest accepted step or tolerance: one leap year.
const MAX_STEP_MINUTES: i64 = 366 * 24 * 60;

/// Step sizes and tolerances for the multi-resolution search.
///
/// Everything is expressed in whole minutes; minute-level resolution is the
/// precision contract of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Scan step for pairs that include a fast body (the Moon).
    pub fast_step_minutes: i64,
    /// Scan step for pairs of slow bodies.
    pub slow_step_minutes: i64,
    /// Boundary bisection stops once its bracket is narrower than this.
    pub boundary_tolerance_minutes: i64,
    /// Grid step of the first peak pass.
    pub peak_coarse_step_minutes: i64,
    /// Grid step of the second peak pass.
    pub peak_fine_step_minutes: i64,
    /// Bisection iteration cap before a boundary counts as degenerate.
    pub max_refine_iterations: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            fast_step_minutes: 60,
            slow_step_minutes: 360,
            boundary_tolerance_minutes: 2,
            peak_coarse_step_minutes: 30,
            peak_fine_step_minutes: 5,
            max_refine_iterations: 64,
        }
    }
}

impl ScanSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("fast_step_minutes", self.fast_step_minutes),
            ("slow_step_minutes", self.slow_step_minutes),
            ("boundary_tolerance_minutes", self.boundary_tolerance_minutes),
            ("peak_coarse_step_minutes", self.peak_coarse_step_minutes),
            ("peak_fine_step_minutes", self.peak_fine_step_minutes),
        ];
        for (name, value) in positive {
            if value <= 0 || value > MAX_STEP_MINUTES {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{} must be in [1, {}], got {}",
                    name, MAX_STEP_MINUTES, value
                )));
            }
        }
        if self.peak_fine_step_minutes > self.peak_coarse_step_minutes {
            return Err(EngineError::InvalidConfiguration(format!(
                "peak fine step ({} min) exceeds coarse step ({} min)",
                self.peak_fine_step_minutes, self.peak_coarse_step_minutes
            )));
        }
        if self.boundary_tolerance_minutes >= self.fast_step_minutes.min(self.slow_step_minutes) {
            return Err(EngineError::InvalidConfiguration(format!(
                "boundary tolerance ({} min) must be below the scan steps",
                self.boundary_tolerance_minutes
            )));
        }
        if self.max_refine_iterations == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_refine_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Scan step for a pair: fine when either body moves fast.
    pub fn step_for(&self, body1: Body, body2: Body) -> TimeDelta {
        if body1.is_fast() || body2.is_fast() {
            TimeDelta::minutes(self.fast_step_minutes)
        } else {
            TimeDelta::minutes(self.slow_step_minutes)
        }
    }

    pub fn boundary_tolerance(&self) -> TimeDelta {
        TimeDelta::minutes(self.boundary_tolerance_minutes)
    }

    pub fn peak_coarse_step(&self) -> TimeDelta {
        TimeDelta::minutes(self.peak_coarse_step_minutes)
    }

    pub fn peak_fine_step(&self) -> TimeDelta {
        TimeDelta::minutes(self.peak_fine_step_minutes)
    }
}
