use crate::ephemeris::Body;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Orb at or below which an event is classified [`Severity::Major`].
pub const MAJOR_ORB_DEG: f64 = 1.0;

/// Upper bound for any per-kind orb limit.
pub const MAX_ORB_LIMIT_DEG: f64 = 45.0;

/// Upper bound for the eclipse latitude threshold.
pub const MAX_ECLIPSE_LATITUDE_DEG: f64 = 10.0;

/// Target angular relationships between two ecliptic longitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Square,
    Opposition,
}

impl AspectKind {
    pub const ALL: [AspectKind; 3] = [
        AspectKind::Conjunction,
        AspectKind::Square,
        AspectKind::Opposition,
    ];

    /// Exact angle for this aspect in degrees.
    pub fn target_deg(self) -> f64 {
        match self {
            AspectKind::Conjunction => 0.0,
            AspectKind::Square => 90.0,
            AspectKind::Opposition => 180.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Square => "square",
            AspectKind::Opposition => "opposition",
        }
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AspectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        AspectKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| format!("unknown aspect kind: {}", s))
    }
}

/// Coarse exactness classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Major,
    Minor,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Maximum allowed deviation per aspect kind, plus the eclipse latitude threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbLimits {
    pub conjunction: f64,
    pub square: f64,
    pub opposition: f64,
    /// Moon latitude (absolute degrees) at or below which a Sun-Moon
    /// conjunction or opposition counts as near a node.
    pub eclipse_latitude: f64,
}

impl Default for OrbLimits {
    fn default() -> Self {
        Self {
            conjunction: 6.0,
            square: 8.0,
            opposition: 8.0,
            eclipse_latitude: 1.5,
        }
    }
}

impl OrbLimits {
    /// Orb limit for one aspect kind.
    pub fn limit_for(&self, kind: AspectKind) -> f64 {
        match kind {
            AspectKind::Conjunction => self.conjunction,
            AspectKind::Square => self.square,
            AspectKind::Opposition => self.opposition,
        }
    }

    /// Reject limits outside `[0, 45]` and a latitude threshold outside `[0, 10]`.
    pub fn validate(&self) -> Result<(), EngineError> {
        for kind in AspectKind::ALL {
            let limit = self.limit_for(kind);
            if !(0.0..=MAX_ORB_LIMIT_DEG).contains(&limit) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{} orb limit {} outside [0, {}]",
                    kind, limit, MAX_ORB_LIMIT_DEG
                )));
            }
        }
        if !(0.0..=MAX_ECLIPSE_LATITUDE_DEG).contains(&self.eclipse_latitude) {
            return Err(EngineError::InvalidConfiguration(format!(
                "eclipse latitude threshold {} outside [0, {}]",
                self.eclipse_latitude, MAX_ECLIPSE_LATITUDE_DEG
            )));
        }
        Ok(())
    }
}

/// A bounded UTC range over which events are detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Opaque label, e.g. a quarter tag like `2025-Q3`.
    pub id: String,
    pub start: DateTime<Utc>,
    /// Exclusive.
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(
        id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let window = Self {
            id: id.into(),
            start,
            end,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.end <= self.start {
            return Err(EngineError::InvalidConfiguration(format!(
                "window {} ends ({}) before it starts ({})",
                self.id, self.end, self.start
            )));
        }
        Ok(())
    }

    /// Inclusive start, exclusive end.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// One detected alignment interval. Built once by the pipeline, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectEvent {
    pub window_id: String,
    pub start: DateTime<Utc>,
    pub peak: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub body1: Body,
    pub body2: Body,
    pub kind: AspectKind,
    /// Degrees, rounded to 3 decimals.
    pub orb_at_peak: f64,
    pub severity: Severity,
    pub is_eclipse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Identity of an event for idempotent upserts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub window_id: String,
    pub body1: Body,
    pub body2: Body,
    pub kind: AspectKind,
    pub peak: DateTime<Utc>,
}

impl AspectEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            window_id: self.window_id.clone(),
            body1: self.body1,
            body2: self.body2,
            kind: self.kind,
            peak: self.peak,
        }
    }
}
