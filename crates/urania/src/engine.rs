use crate::aspects::{AspectEvent, AspectKind, EventClassifier, OrbLimits, Window};
use crate::ephemeris::{Body, PositionOracle};
use crate::error::EngineError;
use crate::search::{
    find_peak, refine_boundary, scan_intervals, CoarseInterval, Crossing, PairProbe, ScanSettings,
};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Instant;

/// Aspect event detection engine.
///
/// Owns a position oracle and the search settings. Every call is a pure
/// function of its arguments plus oracle queries, so one engine can serve
/// many windows concurrently.
pub struct AspectEngine<O> {
    oracle: O,
    settings: ScanSettings,
}

impl<O: PositionOracle> AspectEngine<O> {
    pub fn new(oracle: O, settings: ScanSettings) -> Self {
        Self { oracle, settings }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Detect every aspect event of every body pair inside `window`.
    ///
    /// Runs one pipeline per canonical pair and aspect kind (135 in total).
    /// Any failure aborts the whole run. Events are ordered by peak, then by
    /// pair and kind.
    pub fn detect_events(
        &self,
        window: &Window,
        limits: &OrbLimits,
    ) -> Result<Vec<AspectEvent>, EngineError> {
        self.validate(window, limits)?;

        log::info!(
            "Detecting aspects for window {} ({} .. {})",
            window.id,
            window.start,
            window.end
        );
        let started = Instant::now();
        let classifier = EventClassifier::new(limits.eclipse_latitude);

        let mut events = Vec::new();
        let mut pipelines = 0usize;
        for (body1, body2) in Body::pairs() {
            for kind in AspectKind::ALL {
                events.extend(self.run_pipeline(window, body1, body2, kind, limits, &classifier)?);
                pipelines += 1;
            }
        }

        let detected = events.len();
        let events = finalize(window, events);

        log::info!(
            "Window {}: {} pipelines, {} events ({} outside window dropped) in {:.2?}",
            window.id,
            pipelines,
            events.len(),
            detected - events.len(),
            started.elapsed()
        );

        Ok(events)
    }

    /// Detect events for a single pair and aspect kind.
    ///
    /// The bodies may be given in either order; events always carry the
    /// canonical order.
    pub fn detect_pair(
        &self,
        window: &Window,
        body1: Body,
        body2: Body,
        kind: AspectKind,
        limits: &OrbLimits,
    ) -> Result<Vec<AspectEvent>, EngineError> {
        if body1 == body2 {
            return Err(EngineError::InvalidConfiguration(format!(
                "pair needs two distinct bodies, got {} twice",
                body1
            )));
        }
        self.validate(window, limits)?;

        let (body1, body2) = Body::canonical_pair(body1, body2);
        let classifier = EventClassifier::new(limits.eclipse_latitude);
        let events = self.run_pipeline(window, body1, body2, kind, limits, &classifier)?;
        Ok(finalize(window, events))
    }

    fn validate(&self, window: &Window, limits: &OrbLimits) -> Result<(), EngineError> {
        limits.validate()?;
        self.settings.validate()?;
        window.validate()
    }

    /// Scanner, refiner, peak finder and classifier for one combination.
    fn run_pipeline(
        &self,
        window: &Window,
        body1: Body,
        body2: Body,
        kind: AspectKind,
        limits: &OrbLimits,
        classifier: &EventClassifier,
    ) -> Result<Vec<AspectEvent>, EngineError> {
        let limit = limits.limit_for(kind);
        let probe = PairProbe::new(&self.oracle, body1, body2, kind.target_deg(), limit);
        let step = self.settings.step_for(body1, body2);

        let intervals = scan_intervals(&probe, window.start, window.end, step)?;
        if intervals.is_empty() {
            return Ok(Vec::new());
        }
        log::debug!(
            "{}-{} {}: {} coarse interval(s) at {} min step",
            body1,
            body2,
            kind,
            intervals.len(),
            step.num_minutes()
        );

        let mut events = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let (start, end) = self.refine_interval(&probe, window, &interval, step)?;
            if end <= start {
                log::debug!(
                    "{}-{} {}: refined interval {} .. {} is empty, skipped",
                    body1,
                    body2,
                    kind,
                    start,
                    end
                );
                continue;
            }

            let peak = find_peak(
                &probe,
                start,
                end,
                self.settings.peak_coarse_step(),
                self.settings.peak_fine_step(),
            )?;
            let class = classifier.classify(&self.oracle, body1, body2, kind, peak.at, peak.orb)?;

            if class.orb_at_peak > limit {
                log::debug!(
                    "{}-{} {}: peak orb {} exceeds limit {}, discarded",
                    body1,
                    body2,
                    kind,
                    class.orb_at_peak,
                    limit
                );
                continue;
            }

            log::debug!(
                "{}-{} {}: {} .. {} peak {} orb {:.3}",
                body1,
                body2,
                kind,
                start,
                end,
                peak.at,
                class.orb_at_peak
            );
            events.push(AspectEvent {
                window_id: window.id.clone(),
                start,
                peak: peak.at,
                end,
                body1,
                body2,
                kind,
                orb_at_peak: class.orb_at_peak,
                severity: class.severity,
                is_eclipse: class.is_eclipse,
                note: class.note,
            });
        }

        Ok(events)
    }

    /// Refined `(start, end)` of a coarse interval, clamped into the window.
    ///
    /// An interval already inside the orb at the window start keeps that
    /// start. Every exit is bisected, including one the scan only saw as
    /// still open at the window end; the clamp clips it if the orb persists.
    fn refine_interval(
        &self,
        probe: &PairProbe<'_, O>,
        window: &Window,
        interval: &CoarseInterval,
        step: TimeDelta,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
        let tolerance = self.settings.boundary_tolerance();
        let max_iterations = self.settings.max_refine_iterations;

        let start = if interval.open_at_start {
            window.start
        } else {
            refine_boundary(
                probe,
                interval.enter - step,
                interval.enter + step,
                Crossing::Entering,
                tolerance,
                max_iterations,
            )?
        };

        // The bracket must start on an in-orb sample.
        let end = refine_boundary(
            probe,
            (interval.exit - step).max(interval.enter),
            interval.exit + step,
            Crossing::Exiting,
            tolerance,
            max_iterations,
        )?;

        Ok((clamp(start, window), clamp(end, window)))
    }
}

fn clamp(at: DateTime<Utc>, window: &Window) -> DateTime<Utc> {
    at.clamp(window.start, window.end)
}

/// Keep peaks inside the window and impose the output order.
fn finalize(window: &Window, mut events: Vec<AspectEvent>) -> Vec<AspectEvent> {
    events.retain(|e| window.contains(e.peak));
    events.sort_by(|a, b| {
        (a.peak, a.body1, a.body2, a.kind, a.start).cmp(&(b.peak, b.body1, b.body2, b.kind, b.start))
    });
    events
}
