pub mod angle;
pub mod classifier;
pub mod types;

pub use classifier::{Classification, EventClassifier, NEAR_NODE_NOTE};
pub use types::{AspectEvent, AspectKind, EventKey, OrbLimits, Severity, Window};
