use crate::ephemeris::PositionOracle;
use crate::error::EngineError;
use crate::search::PairProbe;
use chrono::{DateTime, TimeDelta, Utc};

/// Which orb boundary a bracket surrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Outside orb before the boundary, inside after.
    Entering,
    /// Inside orb before the boundary, outside after.
    Exiting,
}

/// Bisect `[lo, hi]` until it is narrower than `tolerance`; returns the midpoint.
///
/// Fails with [`EngineError::NumericalDegenerate`] when `max_iterations`
/// halvings are not enough.
pub fn refine_boundary<O: PositionOracle + ?Sized>(
    probe: &PairProbe<'_, O>,
    mut lo: DateTime<Utc>,
    mut hi: DateTime<Utc>,
    crossing: Crossing,
    tolerance: TimeDelta,
    max_iterations: usize,
) -> Result<DateTime<Utc>, EngineError> {
    let mut iterations = 0;

    while hi - lo > tolerance {
        if iterations >= max_iterations {
            return Err(EngineError::NumericalDegenerate {
                stage: "boundary refinement",
                iterations,
            });
        }

        let mid = lo + (hi - lo) / 2;
        let within = probe.within(mid)?;
        match (crossing, within) {
            (Crossing::Entering, true) | (Crossing::Exiting, false) => hi = mid,
            (Crossing::Entering, false) | (Crossing::Exiting, true) => lo = mid,
        }
        iterations += 1;
    }

    Ok(lo + (hi - lo) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::Body;
    use crate::search::testing::{epoch, LinearSun};

    fn probe_oracle() -> LinearSun {
        // Conjunction with Mars at 100° and a 6° orb: inside for hours 94..=106.
        LinearSun { epoch: epoch(), rate: 1.0, fixed: 100.0 }
    }

    #[test]
    fn refines_entry() {
        let oracle = probe_oracle();
        let probe = PairProbe::new(&oracle, Body::Sun, Body::Mars, 0.0, 6.0);
        let t = refine_boundary(
            &probe,
            epoch() + TimeDelta::hours(93),
            epoch() + TimeDelta::hours(95),
            Crossing::Entering,
            TimeDelta::minutes(2),
            64,
        )
        .unwrap();
        let expected = epoch() + TimeDelta::hours(94);
        assert!((t - expected).num_seconds().abs() <= 120, "t = {t}");
    }

    #[test]
    fn refines_exit() {
        let oracle = probe_oracle();
        let probe = PairProbe::new(&oracle, Body::Sun, Body::Mars, 0.0, 6.0);
        let t = refine_boundary(
            &probe,
            epoch() + TimeDelta::hours(100),
            epoch() + TimeDelta::hours(112),
            Crossing::Exiting,
            TimeDelta::minutes(2),
            64,
        )
        .unwrap();
        let expected = epoch() + TimeDelta::hours(106);
        assert!((t - expected).num_seconds().abs() <= 120, "t = {t}");
    }

    #[test]
    fn iteration_cap_is_a_hard_failure() {
        let oracle = probe_oracle();
        let probe = PairProbe::new(&oracle, Body::Sun, Body::Mars, 0.0, 6.0);
        let err = refine_boundary(
            &probe,
            epoch() + TimeDelta::hours(90),
            epoch() + TimeDelta::hours(98),
            Crossing::Entering,
            TimeDelta::minutes(2),
            3,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NumericalDegenerate { iterations: 3, .. }));
    }

    #[test]
    fn narrow_bracket_returns_midpoint_without_queries() {
        let oracle = probe_oracle();
        let probe = PairProbe::new(&oracle, Body::Sun, Body::Mars, 0.0, 6.0);
        let lo = epoch();
        let hi = epoch() + TimeDelta::minutes(1);
        let t = refine_boundary(&probe, lo, hi, Crossing::Exiting, TimeDelta::minutes(2), 1).unwrap();
        assert_eq!(t, lo + TimeDelta::seconds(30));
    }
}
