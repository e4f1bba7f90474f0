use crate::ephemeris::oracle::{OracleError, PositionOracle};
use crate::ephemeris::types::Body;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use swisseph::swe::{calc_ut, julday};

/// Default install location of the Swiss Ephemeris data files.
pub const DEFAULT_EPHEMERIS_PATH: &str = "/usr/local/share/swisseph";

/// FLG_SWIEPH: read the compressed Swiss Ephemeris files.
const FLG_SWIEPH: u32 = 2;

/// Gregorian calendar flag for `julday`.
const GREG_CAL: u32 = 1;

/// Swiss Ephemeris planet ids: SUN=0 .. PLUTO=9, in [`Body`] order.
fn swiss_id(body: Body) -> u32 {
    match body {
        Body::Sun => 0,
        Body::Moon => 1,
        Body::Mercury => 2,
        Body::Venus => 3,
        Body::Mars => 4,
        Body::Jupiter => 5,
        Body::Saturn => 6,
        Body::Uranus => 7,
        Body::Neptune => 8,
        Body::Pluto => 9,
    }
}

/// Position oracle backed by the Swiss Ephemeris.
///
/// Build one at startup and share it (by reference or `Arc`) with every
/// engine that needs it; construction validates the data directory once.
pub struct SwissEphemerisOracle {
    ephemeris_path: PathBuf,
    // The C library keeps global state; calls go through one lock.
    call_lock: Mutex<()>,
}

impl SwissEphemerisOracle {
    /// Create an oracle with an optional data directory.
    ///
    /// Falls back to `SWISS_EPHEMERIS_PATH`, then [`DEFAULT_EPHEMERIS_PATH`].
    pub fn new(ephemeris_path: Option<PathBuf>) -> Result<Self, OracleError> {
        let path = ephemeris_path.unwrap_or_else(|| {
            env::var("SWISS_EPHEMERIS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_EPHEMERIS_PATH))
        });

        if !path.exists() {
            return Err(OracleError::FileNotFound {
                path: path.display().to_string(),
                message: "Ephemeris path does not exist. Please ensure Swiss Ephemeris data files are installed.".to_string(),
            });
        }

        log::info!("Swiss Ephemeris oracle using {}", path.display());

        Ok(Self {
            ephemeris_path: path,
            call_lock: Mutex::new(()),
        })
    }

    pub fn ephemeris_path(&self) -> &Path {
        &self.ephemeris_path
    }

    /// Raw `(longitude, latitude)` for one body, longitude wrapped to [0, 360).
    fn ecliptic_lon_lat(&self, at: DateTime<Utc>, body: Body) -> Result<(f64, f64), OracleError> {
        let jd = datetime_to_julian_day(at);

        let result = {
            let _guard = self
                .call_lock
                .lock()
                .map_err(|_| OracleError::CalculationFailed {
                    body,
                    datetime: at,
                    message: "ephemeris lock poisoned".to_string(),
                })?;
            calc_ut(jd, swiss_id(body), FLG_SWIEPH).map_err(|e| OracleError::CalculationFailed {
                body,
                datetime: at,
                message: format!("Swiss Ephemeris error: {}", e),
            })?
        };

        let lon = result.out[0];
        let lat = result.out[1];
        if !lon.is_finite() || !lat.is_finite() {
            return Err(OracleError::NonFinite { body, datetime: at });
        }

        Ok((((lon % 360.0) + 360.0) % 360.0, lat))
    }
}

impl PositionOracle for SwissEphemerisOracle {
    fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
        self.ecliptic_lon_lat(at, body).map(|(lon, _)| lon)
    }

    fn moon_latitude(&self, at: DateTime<Utc>) -> Result<f64, OracleError> {
        self.ecliptic_lon_lat(at, Body::Moon).map(|(_, lat)| lat)
    }
}

/// Convert a UTC instant to a Julian Day (UT).
pub fn datetime_to_julian_day(dt: DateTime<Utc>) -> f64 {
    let hour_decimal = dt.hour() as f64
        + dt.minute() as f64 / 60.0
        + (dt.second() as f64 + dt.nanosecond() as f64 * 1e-9) / 3600.0;

    julday(dt.year(), dt.month() as i32, dt.day() as i32, hour_decimal, GREG_CAL)
}
