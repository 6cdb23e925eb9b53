//! Learning analytics derived from the update cadence
//!
//! Metrics are never written directly; they are recomputed from each root
//! transition and the wall-clock spacing between transitions.

mod engine;
mod milestone;

pub use engine::{LearningMetrics, MetricsEngine, ONE_DAY_SECS, ONE_HOUR_SECS};
pub use milestone::{Milestone, IDLE_GAP_SECS};
