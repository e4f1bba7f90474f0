use crate::aspects::types::{AspectKind, Severity, MAJOR_ORB_DEG};
use crate::ephemeris::{Body, OracleError, PositionOracle};
use chrono::{DateTime, Utc};

/// Annotation attached to Sun-Moon alignments close to a lunar node.
pub const NEAR_NODE_NOTE: &str = "near node";

/// Derived attributes of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Rounded to 3 decimals.
    pub orb_at_peak: f64,
    pub severity: Severity,
    pub is_eclipse: bool,
    pub note: Option<String>,
}

/// Round an orb to the persisted precision.
pub fn round_orb(orb: f64) -> f64 {
    (orb * 1000.0).round() / 1000.0
}

/// Major at or below one degree, minor above. The threshold is fixed.
pub fn severity_for(orb_at_peak: f64) -> Severity {
    if orb_at_peak <= MAJOR_ORB_DEG {
        Severity::Major
    } else {
        Severity::Minor
    }
}

/// Only Sun-Moon conjunctions and oppositions can be eclipses.
pub fn is_eclipse_candidate(body1: Body, body2: Body, kind: AspectKind) -> bool {
    let (a, b) = Body::canonical_pair(body1, body2);
    (a, b) == (Body::Sun, Body::Moon)
        && matches!(kind, AspectKind::Conjunction | AspectKind::Opposition)
}

/// Severity and eclipse tagging for a found peak. Holds the Moon latitude
/// threshold under which a Sun-Moon conjunction or opposition counts as an
/// eclipse.
pub struct EventClassifier {
    eclipse_latitude: f64,
}

impl EventClassifier {
    pub fn new(eclipse_latitude: f64) -> Self {
        Self { eclipse_latitude }
    }

    /// Classify an event from its peak orb; queries the Moon's latitude only
    /// for eclipse candidates.
    pub fn classify<O: PositionOracle + ?Sized>(
        &self,
        oracle: &O,
        body1: Body,
        body2: Body,
        kind: AspectKind,
        peak: DateTime<Utc>,
        raw_orb: f64,
    ) -> Result<Classification, OracleError> {
        let orb_at_peak = round_orb(raw_orb);
        let severity = severity_for(orb_at_peak);

        let mut is_eclipse = false;
        if is_eclipse_candidate(body1, body2, kind) {
            let moon_lat = oracle.moon_latitude(peak)?;
            if !moon_lat.is_finite() {
                return Err(OracleError::NonFinite {
                    body: Body::Moon,
                    datetime: peak,
                });
            }
            is_eclipse = moon_lat.abs() <= self.eclipse_latitude;
        }

        Ok(Classification {
            orb_at_peak,
            severity,
            is_eclipse,
            note: is_eclipse.then(|| NEAR_NODE_NOTE.to_string()),
        })
    }
}
