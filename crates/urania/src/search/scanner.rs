use crate::ephemeris::PositionOracle;
use crate::error::EngineError;
use crate::search::PairProbe;
use chrono::{DateTime, TimeDelta, Utc};

/// A stretch of samples that were within orb.
///
/// `enter` is the first sample inside the orb, `exit` the first sample
/// outside it. When the stretch touches the scanned range, the matching flag
/// is set and the time is the range edge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoarseInterval {
    pub enter: DateTime<Utc>,
    pub exit: DateTime<Utc>,
    pub open_at_start: bool,
    pub open_at_end: bool,
}

/// Sweep `[start, end)` with a fixed step, recording within-orb transitions.
pub fn scan_intervals<O: PositionOracle + ?Sized>(
    probe: &PairProbe<'_, O>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: TimeDelta,
) -> Result<Vec<CoarseInterval>, EngineError> {
    if step <= TimeDelta::zero() {
        return Err(EngineError::InvalidConfiguration(format!(
            "scan step must be positive, got {}",
            step
        )));
    }

    let mut intervals = Vec::new();
    let mut open: Option<(DateTime<Utc>, bool)> = None;
    let mut t = start;

    while t < end {
        let within = probe.within(t)?;
        match (within, open) {
            (true, None) => open = Some((t, t == start)),
            (false, Some((enter, open_at_start))) => {
                intervals.push(CoarseInterval {
                    enter,
                    exit: t,
                    open_at_start,
                    open_at_end: false,
                });
                open = None;
            }
            _ => {}
        }
        t += step;
    }

    if let Some((enter, open_at_start)) = open {
        intervals.push(CoarseInterval {
            enter,
            exit: end,
            open_at_start,
            open_at_end: true,
        });
    }

    Ok(intervals)
}
