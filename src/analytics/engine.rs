//! Confidence and velocity computation

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seconds in a day; velocity is expressed in updates per day
pub const ONE_DAY_SECS: u64 = 86_400;

pub const ONE_HOUR_SECS: u64 = 3_600;

/// Derived statistics for one entity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningMetrics {
    pub total_interactions: u64,
    pub learning_events: u64,
    /// Unix seconds of the most recent update (0 before the first)
    pub last_update_timestamp: u64,
    /// `ONE_DAY_SECS / seconds between the last two updates`
    pub learning_velocity: u64,
    pub confidence_score: u64,
}

/// Recomputes [`LearningMetrics`] after each root transition
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsEngine;

impl MetricsEngine {
    pub fn new() -> Self {
        MetricsEngine
    }

    /// Fold one update into `metrics`.
    ///
    /// `update_count` is the entity's update count *including* this update.
    /// Returns the seconds elapsed since the previous `last_update_timestamp`.
    pub fn record_update(&self, metrics: &mut LearningMetrics, update_count: u64, now: u64) -> u64 {
        let previous = metrics.last_update_timestamp;
        let elapsed = now.saturating_sub(previous);

        metrics.total_interactions += 1;
        metrics.learning_events += 1;

        // Zero spacing leaves velocity as it was
        if elapsed > 0 {
            metrics.learning_velocity = ONE_DAY_SECS / elapsed;
        }
        metrics.last_update_timestamp = now;

        metrics.confidence_score = if update_count <= 1 {
            0
        } else {
            update_count
                .saturating_mul(100)
                .saturating_add(elapsed / ONE_HOUR_SECS)
                .saturating_add(1)
        };

        debug!(
            update_count,
            elapsed,
            velocity = metrics.learning_velocity,
            confidence = metrics.confidence_score,
            "metrics recomputed"
        );
        elapsed
    }
}
