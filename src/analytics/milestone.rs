//! Milestones fired by update count and idle time

use super::ONE_DAY_SECS;
use serde::{Deserialize, Serialize};

/// Idle time after which the next commit fires [`Milestone::IdleGap`]
pub const IDLE_GAP_SECS: u64 = 30 * ONE_DAY_SECS;

/// A named learning milestone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// 10th update
    FirstDecade,
    /// 100th update
    Centurion,
    /// 1000th update
    Millennium,
    /// The entity resumed after at least 30 idle days
    IdleGap { idle_days: u64 },
}

impl Milestone {
    pub fn name(&self) -> &'static str {
        match self {
            Milestone::FirstDecade => "First Decade",
            Milestone::Centurion => "Centurion",
            Milestone::Millennium => "Millennium",
            Milestone::IdleGap { .. } => "Return After Break",
        }
    }

    /// Milestones reached by a commit.
    ///
    /// `update_count` includes the commit; `idle_secs` is the gap since the
    /// previous update, or `None` when there was none.
    pub fn reached(update_count: u64, idle_secs: Option<u64>) -> Vec<Milestone> {
        let mut reached = Vec::new();
        match update_count {
            10 => reached.push(Milestone::FirstDecade),
            100 => reached.push(Milestone::Centurion),
            1000 => reached.push(Milestone::Millennium),
            _ => {}
        }
        if let Some(idle) = idle_secs.filter(|s| *s >= IDLE_GAP_SECS) {
            reached.push(Milestone::IdleGap {
                idle_days: idle / ONE_DAY_SECS,
            });
        }
        reached
    }
}
