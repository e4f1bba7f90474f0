use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use urania::{
    AspectEvent, AspectSummary, DetectionPool, EventQuery, EventStore, OrbLimits, PositionOracle, Quarter,
    QuarterInfo, StoredEvent, Window,
};

/// Outcome of a `generate` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReport {
    pub quarter: String,
    pub inserted_or_updated: usize,
    pub total_aspects: usize,
    pub execution_time_seconds: f64,
    /// `generated`, `already_exists` or `no_aspects_found`.
    pub status: String,
    pub summary: AspectSummary,
}

/// Stored events for one quarter, filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListReport {
    pub quarter: String,
    pub total_count: usize,
    pub aspects: Vec<StoredEvent>,
    /// Statistics over the whole quarter, not just the filtered rows.
    pub summary: AspectSummary,
}

/// Detect and store events for `quarter`, unless the store already has some
/// and `force` is off.
pub async fn generate<O, S>(
    pool: &DetectionPool<O>,
    store: &S,
    quarter: &Quarter,
    limits: OrbLimits,
    force: bool,
) -> anyhow::Result<GenerateReport>
where
    O: PositionOracle + 'static,
    S: EventStore + ?Sized,
{
    let started = Instant::now();
    let tag = quarter.to_string();
    log::info!("Generating aspects for quarter {}", tag);

    if !force {
        let existing = store.count(&tag).await?;
        if existing > 0 {
            log::info!("Quarter {} already has {} aspects", tag, existing);
            let events = stored_events(store, &tag).await?;
            return Ok(GenerateReport {
                quarter: tag,
                inserted_or_updated: 0,
                total_aspects: existing,
                execution_time_seconds: seconds(started),
                status: "already_exists".to_string(),
                summary: AspectSummary::from_events(&events),
            });
        }
    }

    let events = pool
        .run(Window::from_quarter(quarter), limits)
        .await
        .with_context(|| format!("Aspect detection failed for {}", tag))?;

    if events.is_empty() {
        log::warn!("No aspects found for quarter {}", tag);
        return Ok(GenerateReport {
            quarter: tag,
            inserted_or_updated: 0,
            total_aspects: 0,
            execution_time_seconds: seconds(started),
            status: "no_aspects_found".to_string(),
            summary: AspectSummary::default(),
        });
    }

    let written = store
        .upsert(&events)
        .await
        .with_context(|| format!("Failed to store aspects for {}", tag))?;
    log::info!(
        "Stored {} aspects for {} in the {} store",
        written,
        tag,
        store.backend_type()
    );

    Ok(GenerateReport {
        quarter: tag,
        inserted_or_updated: written,
        total_aspects: events.len(),
        execution_time_seconds: seconds(started),
        status: "generated".to_string(),
        summary: AspectSummary::from_events(&events),
    })
}

/// Fetch stored events matching `query`, scoped to `quarter`.
pub async fn list<S>(store: &S, quarter: &Quarter, query: EventQuery) -> anyhow::Result<ListReport>
where
    S: EventStore + ?Sized,
{
    let tag = quarter.to_string();
    let query = EventQuery {
        window_id: Some(tag.clone()),
        ..query
    };
    let aspects = store.fetch(&query).await?;
    let all = stored_events(store, &tag).await?;

    Ok(ListReport {
        quarter: tag,
        total_count: aspects.len(),
        aspects,
        summary: AspectSummary::from_events(&all),
    })
}

pub fn window_info(quarter: &Quarter, now: DateTime<Utc>) -> QuarterInfo {
    quarter.info(now)
}

async fn stored_events<S>(store: &S, window_id: &str) -> anyhow::Result<Vec<AspectEvent>>
where
    S: EventStore + ?Sized,
{
    Ok(store
        .fetch(&EventQuery::window(window_id))
        .await?
        .into_iter()
        .map(|r| r.event)
        .collect())
}

fn seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use urania::{AspectEngine, Body, MemoryStore, OracleError, ScanSettings};

    /// Sun drifts 1°/day from 0° at 2025-07-01. Every other body is fixed
    /// and out of orb with every other fixed body.
    struct Drift;

    impl PositionOracle for Drift {
        fn longitude(&self, at: DateTime<Utc>, body: Body) -> Result<f64, OracleError> {
            let epoch = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
            let days = (at - epoch).num_seconds() as f64 / 86_400.0;
            Ok(match body {
                Body::Sun => days.rem_euclid(360.0),
                Body::Mars => 0.0,
                other => 100.0 + 7.0 * other.index() as f64,
            })
        }

        fn moon_latitude(&self, _at: DateTime<Utc>) -> Result<f64, OracleError> {
            Ok(5.0)
        }
    }

    fn pool() -> DetectionPool<Drift> {
        let engine = Arc::new(AspectEngine::new(Drift, ScanSettings::default()));
        DetectionPool::new(engine, 1).unwrap()
    }

    #[tokio::test]
    async fn generate_then_skip_then_force() {
        let store = MemoryStore::new();
        let quarter: Quarter = "2025-Q3".parse().unwrap();

        let first = generate(&pool(), &store, &quarter, OrbLimits::default(), false)
            .await
            .unwrap();
        assert_eq!(first.status, "generated");
        assert!(first.total_aspects > 0);
        assert_eq!(first.inserted_or_updated, first.total_aspects);

        let second = generate(&pool(), &store, &quarter, OrbLimits::default(), false)
            .await
            .unwrap();
        assert_eq!(second.status, "already_exists");
        assert_eq!(second.inserted_or_updated, 0);
        assert_eq!(second.total_aspects, first.total_aspects);
        assert_eq!(second.summary, first.summary);

        let forced = generate(&pool(), &store, &quarter, OrbLimits::default(), true)
            .await
            .unwrap();
        assert_eq!(forced.status, "generated");
        assert_eq!(store.count("2025-Q3").await.unwrap(), first.total_aspects);
    }

    #[tokio::test]
    async fn list_filters_within_quarter() {
        let store = MemoryStore::new();
        let quarter: Quarter = "2025-Q3".parse().unwrap();
        generate(&pool(), &store, &quarter, OrbLimits::default(), false)
            .await
            .unwrap();

        let query = EventQuery {
            body: Some(Body::Mars),
            ..Default::default()
        };
        let report = list(&store, &quarter, query).await.unwrap();
        assert!(report.total_count > 0);
        assert!(report
            .aspects
            .iter()
            .all(|r| r.event.body1 == Body::Mars || r.event.body2 == Body::Mars));
        assert!(report.summary.total_aspects >= report.total_count);

        let other: Quarter = "2025-Q4".parse().unwrap();
        assert_eq!(list(&store, &other, EventQuery::default()).await.unwrap().total_count, 0);
    }

    #[test]
    fn window_info_for_quarter() {
        let quarter: Quarter = "2025-Q3".parse().unwrap();
        let info = window_info(&quarter, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(info.quarter, "2025-Q3");
        assert!(!info.current);
        assert_eq!(info.days_total, 92);
    }
}
