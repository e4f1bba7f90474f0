//! Angle helpers shared by every search stage.

use crate::ephemeris::{Body, OracleError, PositionOracle};
use chrono::{DateTime, Utc};

/// Reduce an angle into `[0, 360)`.
///
/// Double modulo keeps tiny negative inputs from rounding up to exactly 360.
pub fn wrap(deg: f64) -> f64 {
    ((deg % 360.0) + 360.0) % 360.0
}

/// Signed distance from `longitude_diff` to `target`, in `[-180, 180)`.
///
/// A pair near conjunction straddling 359°/1° yields a small delta, not ~358°.
pub fn signed_delta(longitude_diff: f64, target: f64) -> f64 {
    wrap(longitude_diff - target + 180.0) - 180.0
}

/// Separation `body2 - body1`, wrapped to `[0, 360)`.
pub fn separation(lon1: f64, lon2: f64) -> f64 {
    wrap(lon2 - lon1)
}

/// Absolute deviation of the pair's separation from `target` at `at`.
pub fn orb<O: PositionOracle + ?Sized>(
    oracle: &O,
    at: DateTime<Utc>,
    body1: Body,
    body2: Body,
    target: f64,
) -> Result<f64, OracleError> {
    let lon1 = finite(oracle.longitude(at, body1)?, body1, at)?;
    let lon2 = finite(oracle.longitude(at, body2)?, body2, at)?;
    Ok(signed_delta(separation(lon1, lon2), target).abs())
}

fn finite(value: f64, body: Body, at: DateTime<Utc>) -> Result<f64, OracleError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(OracleError::NonFinite { body, datetime: at })
    }
}
