use crate::ephemeris::types::Body;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a position source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Ephemeris file not found at path: {path}. {message}")]
    FileNotFound { path: String, message: String },
    #[error("Failed to calculate position for {body} at {datetime}: {message}")]
    CalculationFailed {
        body: Body,
        datetime: DateTime<Utc>,
        message: String,
    },
    #[error("Position source returned a non-finite value for {body} at {datetime}")]
    NonFinite { body: Body, datetime: DateTime<Utc> },
}

/// Read-only source of geocentric ecliptic positions.
///
/// Implementations must be deterministic: the same instant and body always
/// yield the same value. The engine calls them many times per pipeline and
/// from several worker threads at once.
pub trait PositionOracle: Send + Sync {
    /// Ecliptic longitude in degrees, wrapped to `[0, 360)`.
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError>;

    /// Ecliptic latitude of the Moon in degrees.
    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError>;
}

impl<T: PositionOracle + ?Sized> PositionOracle for &T {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        (**self).longitude(at, body)
    }

    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        (**self).moon_latitude(at)
    }
}

impl<T: PositionOracle + ?Sized> PositionOracle for Arc<T> {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        (**self).longitude(at, body)
    }

    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        (**self).moon_latitude(at)
    }
}
