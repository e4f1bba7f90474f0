#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use urania::{Body, OracleError, PositionOracle};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

/// Every body moves at a constant rate from a fixed offset.
pub struct LinearOracle {
    pub epoch: DateTime<Utc>,
    /// Degrees at `epoch`, indexed like `Body::ALL`.
    pub offsets: [f64; 10],
    /// Degrees per hour.
    pub rates: [f64; 10],
    pub moon_latitude: f64,
}

impl LinearOracle {
    /// Body A (the Sun) at 1°/hour from 0°, body B (Mars) fixed at 90°.
    /// The rest sit still, spread so none of them align with each other.
    pub fn sweep_past_fixed() -> Self {
        let offsets = [0.0, 300.0, 307.0, 314.0, 90.0, 321.0, 328.0, 335.0, 342.0, 349.0];
        let mut rates = [0.0; 10];
        rates[Body::Sun.index()] = 1.0;
        Self {
            epoch: epoch(),
            offsets,
            rates,
            moon_latitude: 5.0,
        }
    }

    /// Mean daily motions of the real bodies, so a quarter holds a realistic
    /// mix of fast and slow events.
    pub fn solar_system(moon_latitude: f64) -> Self {
        let per_day = [1.0, 13.18, 1.38, 1.2, 0.52, 0.083, 0.033, 0.012, 0.006, 0.004];
        let offsets = [100.0, 10.0, 95.0, 140.0, 160.0, 100.0, 0.0, 60.0, 2.0, 301.0];
        Self {
            epoch: epoch(),
            offsets,
            rates: per_day.map(|d| d / 24.0),
            moon_latitude,
        }
    }
}

impl PositionOracle for LinearOracle {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        let hours = (at - self.epoch).num_milliseconds() as f64 / 3_600_000.0;
        let i = body.index();
        Ok((self.offsets[i] + self.rates[i] * hours).rem_euclid(360.0))
    }

    fn moon_latitude(&self, _at: DateTime<Utc>) -> Result<f64, OracleError> {
        Ok(self.moon_latitude)
    }
}

/// Counts every query before delegating.
pub struct CountingOracle<O> {
    pub inner: O,
    pub calls: AtomicUsize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<O: PositionOracle> PositionOracle for CountingOracle<O> {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.longitude(at, body)
    }

    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.moon_latitude(at)
    }
}

/// Fails for one body from `from` onwards.
pub struct FailingOracle<O> {
    pub inner: O,
    pub body: Body,
    pub from: DateTime<Utc>,
    pub non_finite: bool,
}

impl<O: PositionOracle> PositionOracle for FailingOracle<O> {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        if body == self.body && at >= self.from {
            if self.non_finite {
                return Ok(f64::NAN);
            }
            return Err(OracleError::CalculationFailed {
                body,
                datetime: at,
                message: "no data".to_string(),
            });
        }
        self.inner.longitude(at, body)
    }

    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        self.inner.moon_latitude(at)
    }
}
