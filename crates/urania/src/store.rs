//! Idempotent persistence of detected events.
//!
//! Records are keyed by `(window_id, body1, body2, kind, peak)`; upserting the
//! same event again replaces its payload and leaves the record count alone.

use crate::aspects::{AspectEvent, AspectKind, EventKey, Severity};
use crate::ephemeris::Body;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An event as persisted, with its record metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub event: AspectEvent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for [`EventStore::fetch`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub window_id: Option<String>,
    pub body1: Option<Body>,
    pub body2: Option<Body>,
    /// Matches either side of the pair.
    pub body: Option<Body>,
    pub kind: Option<AspectKind>,
    pub severity: Option<Severity>,
    pub is_eclipse: Option<bool>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn window(window_id: impl Into<String>) -> Self {
        Self {
            window_id: Some(window_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &AspectEvent) -> bool {
        self.window_id.as_deref().map_or(true, |w| event.window_id == w)
            && self.body1.map_or(true, |b| event.body1 == b)
            && self.body2.map_or(true, |b| event.body2 == b)
            && self.body.map_or(true, |b| event.body1 == b || event.body2 == b)
            && self.kind.map_or(true, |k| event.kind == k)
            && self.severity.map_or(true, |s| event.severity == s)
            && self.is_eclipse.map_or(true, |e| event.is_eclipse == e)
    }
}

/// Backend for persisting aspect events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert or replace each event; returns the number of rows written.
    async fn upsert(&self, events: &[AspectEvent]) -> Result<usize, StoreError>;

    /// Number of stored events for a window.
    async fn count(&self, window_id: &str) -> Result<usize, StoreError>;

    /// Matching events ordered by peak.
    async fn fetch(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, StoreError>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}

type Records = BTreeMap<EventKey, StoredEvent>;

fn apply_upsert(records: &mut Records, events: &[AspectEvent], now: DateTime<Utc>) -> usize {
    for event in events {
        records
            .entry(event.key())
            .and_modify(|stored| {
                stored.event = event.clone();
                stored.updated_at = now;
            })
            .or_insert_with(|| StoredEvent {
                id: Uuid::new_v4(),
                event: event.clone(),
                created_at: now,
                updated_at: now,
            });
    }
    events.len()
}

fn count_window(records: &Records, window_id: &str) -> usize {
    records.keys().filter(|k| k.window_id == window_id).count()
}

fn select(records: &Records, query: &EventQuery) -> Vec<StoredEvent> {
    let mut found: Vec<StoredEvent> = records
        .values()
        .filter(|r| query.matches(&r.event))
        .cloned()
        .collect();
    found.sort_by(|a, b| {
        let (a, b) = (&a.event, &b.event);
        (a.peak, a.body1, a.body2, a.kind).cmp(&(b.peak, b.body1, b.body2, b.kind))
    });
    if let Some(limit) = query.limit {
        found.truncate(limit);
    }
    found
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn upsert(&self, events: &[AspectEvent]) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        Ok(apply_upsert(&mut records, events, Utc::now()))
    }

    async fn count(&self, window_id: &str) -> Result<usize, StoreError> {
        Ok(count_window(&*self.records.read().await, window_id))
    }

    async fn fetch(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, StoreError> {
        Ok(select(&*self.records.read().await, query))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Store backed by a single JSON file.
///
/// The whole record set is held in memory and rewritten after every upsert:
/// serialized to a sibling temp file, then renamed over the target.
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Records>,
}

impl JsonFileStore {
    /// Open `path`, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Records::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<StoredEvent> = serde_json::from_slice(&bytes)?;
                for record in stored {
                    records.insert(record.event.key(), record);
                }
                log::info!("Loaded {} stored events from {}", records.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Event store {} does not exist yet", path.display());
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let rows: Vec<&StoredEvent> = records.values().collect();
        let json = serde_json::to_vec_pretty(&rows)?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn upsert(&self, events: &[AspectEvent]) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let written = apply_upsert(&mut next, events, Utc::now());

        self.persist(&next).await?;
        *records = next;

        log::debug!("Upserted {} events into {}", written, self.path.display());
        Ok(written)
    }

    async fn count(&self, window_id: &str) -> Result<usize, StoreError> {
        Ok(count_window(&*self.records.read().await, window_id))
    }

    async fn fetch(&self, query: &EventQuery) -> Result<Vec<StoredEvent>, StoreError> {
        Ok(select(&*self.records.read().await, query))
    }

    fn backend_type(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn event(window: &str, hour: i64, body2: Body) -> AspectEvent {
        let base = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        AspectEvent {
            window_id: window.into(),
            start: base + TimeDelta::hours(hour - 1),
            peak: base + TimeDelta::hours(hour),
            end: base + TimeDelta::hours(hour + 1),
            body1: Body::Sun,
            body2,
            kind: AspectKind::Square,
            orb_at_peak: 0.25,
            severity: Severity::Major,
            is_eclipse: false,
            note: None,
        }
    }

    #[tokio::test]
    async fn memory_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let events = vec![event("2025-Q3", 5, Body::Mars), event("2025-Q3", 2, Body::Venus)];

        assert_eq!(store.upsert(&events).await.unwrap(), 2);
        let first = store.fetch(&EventQuery::window("2025-Q3")).await.unwrap();

        assert_eq!(store.upsert(&events).await.unwrap(), 2);
        assert_eq!(store.count("2025-Q3").await.unwrap(), 2);

        let second = store.fetch(&EventQuery::window("2025-Q3")).await.unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.created_at, b.created_at);
            assert!(b.updated_at >= a.updated_at);
        }
    }

    #[tokio::test]
    async fn fetch_filters_and_orders_by_peak() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                event("2025-Q3", 9, Body::Mars),
                event("2025-Q3", 3, Body::Venus),
                event("2025-Q3", 6, Body::Mars),
                event("2025-Q4", 1, Body::Mars),
            ])
            .await
            .unwrap();

        let all = store.fetch(&EventQuery::window("2025-Q3")).await.unwrap();
        let hours: Vec<u32> = all.iter().map(|r| chrono::Timelike::hour(&r.event.peak)).collect();
        assert_eq!(hours, vec![3, 6, 9]);

        let query = EventQuery {
            body: Some(Body::Mars),
            limit: Some(1),
            ..EventQuery::window("2025-Q3")
        };
        let mars = store.fetch(&query).await.unwrap();
        assert_eq!(mars.len(), 1);
        assert_eq!(mars[0].event.body2, Body::Mars);

        assert_eq!(store.count("2025-Q4").await.unwrap(), 1);
        assert_eq!(store.count("2026-Q1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.upsert(&[event("2025-Q3", 4, Body::Saturn)]).await.unwrap();
        let id = store.fetch(&EventQuery::default()).await.unwrap()[0].id;
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.count("2025-Q3").await.unwrap(), 1);
        reopened.upsert(&[event("2025-Q3", 4, Body::Saturn)]).await.unwrap();
        let records = reopened.fetch(&EventQuery::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path).await, Err(StoreError::Serde(_))));
    }
}
