use crate::aspects::{classifier::round_orb, AspectEvent, AspectKind, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics over a list of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AspectSummary {
    pub total_aspects: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_kind: BTreeMap<AspectKind, usize>,
    /// Keyed `BODY1-BODY2`, e.g. `SUN-MOON`.
    pub by_pair: BTreeMap<String, usize>,
    pub eclipse_count: usize,
    /// Mean peak orb, 3 decimals; zero when there are no events.
    pub average_orb: f64,
    pub earliest_peak: Option<DateTime<Utc>>,
    pub latest_peak: Option<DateTime<Utc>>,
}

impl AspectSummary {
    pub fn from_events(events: &[AspectEvent]) -> Self {
        let mut summary = AspectSummary {
            total_aspects: events.len(),
            ..Default::default()
        };
        let mut orb_total = 0.0;

        for event in events {
            *summary.by_severity.entry(event.severity).or_default() += 1;
            *summary.by_kind.entry(event.kind).or_default() += 1;
            *summary
                .by_pair
                .entry(format!("{}-{}", event.body1, event.body2))
                .or_default() += 1;
            if event.is_eclipse {
                summary.eclipse_count += 1;
            }
            orb_total += event.orb_at_peak;

            summary.earliest_peak = Some(match summary.earliest_peak {
                Some(t) => t.min(event.peak),
                None => event.peak,
            });
            summary.latest_peak = Some(match summary.latest_peak {
                Some(t) => t.max(event.peak),
                None => event.peak,
            });
        }

        if !events.is_empty() {
            summary.average_orb = round_orb(orb_total / events.len() as f64);
        }
        summary
    }
}
