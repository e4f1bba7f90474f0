//! Aspect event detection.
//!
//! Finds every interval in a time window during which a pair of bodies sits
//! within orb of a conjunction, square or opposition, along with the instant
//! of closest approach and its classification.

pub mod aspects;
pub mod engine;
pub mod ephemeris;
pub mod error;
pub mod quarter;
pub mod search;
pub mod store;
pub mod summary;
pub mod worker;

pub use aspects::{AspectEvent, AspectKind, EventKey, OrbLimits, Severity, Window};
pub use engine::AspectEngine;
pub use ephemeris::{Body, OracleError, PositionOracle, SwissEphemerisOracle};
pub use error::EngineError;
pub use quarter::{Quarter, QuarterError, QuarterInfo};
pub use search::ScanSettings;
pub use store::{EventQuery, EventStore, JsonFileStore, MemoryStore, StoreError, StoredEvent};
pub use summary::AspectSummary;
pub use worker::DetectionPool;
