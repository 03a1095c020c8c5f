//! Progress summary for one challenge.

use serde::{Deserialize, Serialize};

use super::{Challenge, DayStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub total_days: u32,
    pub completed: usize,
    pub compensated: usize,
    pub missed: usize,
    pub pending: usize,
    /// completed + compensated
    pub resolved: usize,
    /// 0.0 ..= 100.0
    pub completion_pct: f64,
}

impl Challenge {
    pub fn progress(&self) -> ChallengeProgress {
        let days = self.days();
        let completed = days.count(DayStatus::Completed);
        let compensated = days.count(DayStatus::Compensated);
        let resolved = completed + compensated;
        let completion_pct = if self.total_days() == 0 {
            0.0
        } else {
            (resolved as f64 / self.total_days() as f64 * 100.0).min(100.0)
        };
        ChallengeProgress {
            total_days: self.total_days(),
            completed,
            compensated,
            missed: days.count(DayStatus::Missed),
            pending: days.count(DayStatus::Pending),
            resolved,
            completion_pct,
        }
    }
}
