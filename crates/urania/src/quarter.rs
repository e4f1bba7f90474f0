//! Calendar quarters as detection windows.
//!
//! Quarters are written `YYYY-Qn` and cover three whole UTC months: Q1 is
//! January to March, Q4 is October to December and ends at January 1 of the
//! following year (exclusive).

use crate::aspects::Window;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static::lazy_static! {
    static ref QUARTER_PATTERN: Regex = Regex::new(r"^(\d{4})-Q([1-4])$").expect("Invalid regex");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuarterError {
    #[error("Invalid quarter format: {0}. Expected format: YYYY-Q[1-4]")]
    InvalidFormat(String),
    #[error("Quarter {year}-Q{number} is outside the supported calendar range")]
    OutOfRange { year: i32, number: u32 },
}

/// A calendar quarter with precomputed UTC bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    number: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Quarter {
    pub fn new(year: i32, number: u32) -> Result<Self, QuarterError> {
        if !(1..=4).contains(&number) {
            return Err(QuarterError::InvalidFormat(format!("{}-Q{}", year, number)));
        }
        let out_of_range = || QuarterError::OutOfRange { year, number };

        let start = month_start(year, start_month(number)).ok_or_else(out_of_range)?;
        let end = if number == 4 {
            year.checked_add(1).and_then(|y| month_start(y, 1))
        } else {
            month_start(year, start_month(number + 1))
        }
        .ok_or_else(out_of_range)?;

        Ok(Self {
            year,
            number,
            start,
            end,
        })
    }

    /// Quarter that contains `at`.
    pub fn containing(at: DateTime<Utc>) -> Result<Self, QuarterError> {
        Self::new(at.year(), (at.month() - 1) / 3 + 1)
    }

    /// Quarter containing the current UTC instant.
    pub fn current() -> Result<Self, QuarterError> {
        Self::containing(Utc::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// `(start, end)`: inclusive start, exclusive end.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    pub fn next(&self) -> Result<Self, QuarterError> {
        if self.number == 4 {
            let year = self.year.checked_add(1).ok_or(QuarterError::OutOfRange {
                year: self.year,
                number: 1,
            })?;
            Self::new(year, 1)
        } else {
            Self::new(self.year, self.number + 1)
        }
    }

    pub fn previous(&self) -> Result<Self, QuarterError> {
        if self.number == 1 {
            let year = self.year.checked_sub(1).ok_or(QuarterError::OutOfRange {
                year: self.year,
                number: 4,
            })?;
            Self::new(year, 4)
        } else {
            Self::new(self.year, self.number - 1)
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Descriptive summary relative to `now`.
    pub fn info(&self, now: DateTime<Utc>) -> QuarterInfo {
        let current = self.contains(now);
        QuarterInfo {
            quarter: self.to_string(),
            start: self.start,
            end: self.end,
            current,
            days_total: (self.end - self.start).num_days(),
            days_remaining: current.then(|| (self.end - now).num_days()),
        }
    }
}

fn start_month(number: u32) -> u32 {
    (number - 1) * 3 + 1
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.number)
    }
}

impl FromStr for Quarter {
    type Err = QuarterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = QUARTER_PATTERN
            .captures(s)
            .ok_or_else(|| QuarterError::InvalidFormat(s.to_string()))?;
        let year = caps[1]
            .parse::<i32>()
            .map_err(|_| QuarterError::InvalidFormat(s.to_string()))?;
        let number = caps[2]
            .parse::<u32>()
            .map_err(|_| QuarterError::InvalidFormat(s.to_string()))?;
        Self::new(year, number)
    }
}

impl TryFrom<String> for Quarter {
    type Error = QuarterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quarter> for String {
    fn from(quarter: Quarter) -> Self {
        quarter.to_string()
    }
}

/// Quarter details for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterInfo {
    pub quarter: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub current: bool,
    pub days_total: i64,
    /// Whole days left; only set for the quarter containing `now`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

impl Window {
    /// Window spanning a quarter, labelled with its `YYYY-Qn` tag.
    pub fn from_quarter(quarter: &Quarter) -> Self {
        let (start, end) = quarter.bounds();
        Window {
            id: quarter.to_string(),
            start,
            end,
        }
    }
}
