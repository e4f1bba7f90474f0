use crate::ephemeris::PositionOracle;
use crate::error::EngineError;
use crate::search::PairProbe;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Instant of minimum orb inside an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub at: DateTime<Utc>,
    /// Unrounded orb recomputed at `at`.
    pub orb: f64,
}

/// Locate the minimum orb inside `[start, end)`.
///
/// A coarse grid over the whole interval is followed by a fine grid spanning
/// one coarse step on either side of the coarse minimum. The winner is moved
/// to a whole minute when that minute still lies inside the interval.
pub fn find_peak<O: PositionOracle + ?Sized>(
    probe: &PairProbe<'_, O>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    coarse: TimeDelta,
    fine: TimeDelta,
) -> Result<Peak, EngineError> {
    if coarse <= TimeDelta::zero() || fine <= TimeDelta::zero() {
        return Err(EngineError::InvalidConfiguration(format!(
            "peak grid steps must be positive, got {} / {}",
            coarse, fine
        )));
    }

    let mut best_at = start;
    let mut best_orb = probe.orb(start)?;

    let mut t = start + coarse;
    while t < end {
        let orb = probe.orb(t)?;
        if orb < best_orb {
            best_orb = orb;
            best_at = t;
        }
        t += coarse;
    }

    let lo = (best_at - coarse).max(start);
    let hi = (best_at + coarse).min(end);
    let mut t = lo;
    while t <= hi && t < end {
        if t != best_at {
            let orb = probe.orb(t)?;
            if orb < best_orb {
                best_orb = orb;
                best_at = t;
            }
        }
        t += fine;
    }

    let at = round_to_minute_within(best_at, start, end);
    let orb = if at == best_at { best_orb } else { probe.orb(at)? };

    Ok(Peak { at, orb })
}

/// Nearest whole minute (half-minute ties go down), else floor, else ceiling;
/// the first candidate inside `[start, end)` wins. Falls back to `at` itself.
fn round_to_minute_within(
    at: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DateTime<Utc> {
    let minute = TimeDelta::minutes(1);
    let Ok(floor) = at.duration_trunc(minute) else {
        return at;
    };
    let ceil = if floor == at { floor } else { floor + minute };
    let nearest = if at - floor > TimeDelta::seconds(30) { ceil } else { floor };

    [nearest, floor, ceil]
        .into_iter()
        .find(|t| start <= *t && *t < end)
        .unwrap_or(at)
}
