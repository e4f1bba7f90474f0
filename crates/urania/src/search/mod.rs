//! Multi-resolution search over one (pair, aspect) combination.
//!
//! The stages run in order for every combination:
//! 1. [`scanner::scan_intervals`] sweeps the window with a fixed step and
//!    brackets every stretch where the pair is within orb.
//! 2. [`refiner::refine_boundary`] bisects each bracket edge down to the
//!    boundary tolerance.
//! 3. [`peak::find_peak`] locates the minimum orb inside the refined interval
//!    with a coarse grid followed by a fine grid, rounded to the minute.

pub mod peak;
pub mod refiner;
pub mod scanner;
pub mod settings;

pub use peak::{find_peak, Peak};
pub use refiner::{refine_boundary, Crossing};
pub use scanner::{scan_intervals, CoarseInterval};
pub use settings::ScanSettings;

use crate::aspects::angle;
use crate::ephemeris::{Body, OracleError, PositionOracle};
use chrono::{DateTime, Utc};

/// Orb evaluator bound to one body pair, target angle and orb limit.
pub struct PairProbe<'a, O: ?Sized> {
    oracle: &'a O,
    pub body1: Body,
    pub body2: Body,
    pub target: f64,
    pub limit: f64,
}

impl<'a, O: PositionOracle + ?Sized> PairProbe<'a, O> {
    pub fn new(oracle: &'a O, body1: Body, body2: Body, target: f64, limit: f64) -> Self {
        Self {
            oracle,
            body1,
            body2,
            target,
            limit,
        }
    }

    pub fn orb(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        angle::orb(self.oracle, at, self.body1, self.body2, self.target)
    }

    pub fn within(&self, at: DateTime<Utc>) -> Result<bool, OracleError> {
        Ok(self.orb(at)? <= self.limit)
    }
}
