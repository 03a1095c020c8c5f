//! Challenge aggregate.
//!
//! A challenge owns its [`DayRegistry`] and [`MissedDayLedger`]. All state
//! changes go through the lifecycle methods in [`lifecycle`], which keep the
//! following invariants:
//!
//! - `days.len() == total_days`, numbered exactly `1..=total_days`
//! - every queued missed id refers to a `missed` day, and every `missed` day
//!   is queued
//! - every compensation key refers to a `compensated` day, every value to an
//!   appended make-up slot, and make-up slots are used at most once
//!
//! [`Challenge::validate`] re-checks them, e.g. after loading a snapshot.

mod day;
mod ledger;
pub mod lifecycle;
mod progress;

pub use day::{Day, DayRegistry, DayStatus};
pub use ledger::MissedDayLedger;
pub use lifecycle::{LifecyclePolicy, MAX_MAKEUP_SLOTS_PER_CALL};
pub use progress::ChallengeProgress;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of slots in a fresh challenge.
pub const CHALLENGE_LENGTH_DAYS: u32 = 30;

/// Challenge status.
///
/// `Active` is the only non-terminal state; `Completed`, `Failed` and
/// `Archived` never change again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Archived,
}

impl ChallengeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChallengeStatus::Active)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChallengeStatus::Active => "active",
            ChallengeStatus::Completed => "completed",
            ChallengeStatus::Failed => "failed",
            ChallengeStatus::Archived => "archived",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ChallengeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ChallengeStatus::Active),
            "completed" => Ok(ChallengeStatus::Completed),
            "failed" => Ok(ChallengeStatus::Failed),
            "archived" => Ok(ChallengeStatus::Archived),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown challenge status '{other}'"),
            }),
        }
    }
}

/// One 30-plus-day commitment cycle owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// How the daily task is carried out
    pub execution_details: String,
    pub start_at: DateTime<Utc>,
    /// Scheduled instant of the last slot
    end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: ChallengeStatus,
    days: DayRegistry,
    total_days: u32,
    #[serde(flatten)]
    ledger: MissedDayLedger,
}

impl Challenge {
    /// Fresh active challenge with 30 pending slots starting at `start_at`.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        execution_details: impl Into<String>,
        start_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = format!("challenge-{}", uuid::Uuid::new_v4());
        let days = DayRegistry::schedule(&id, start_at, CHALLENGE_LENGTH_DAYS);
        let end_at = days.last().map(|d| d.scheduled_at).unwrap_or(start_at);
        Self {
            id,
            user_id: user_id.into(),
            title: title.into(),
            description: description.into(),
            execution_details: execution_details.into(),
            start_at,
            end_at,
            created_at,
            completed_at: None,
            status: ChallengeStatus::Active,
            days,
            total_days: CHALLENGE_LENGTH_DAYS,
            ledger: MissedDayLedger::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ChallengeStatus::Active
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    pub fn days(&self) -> &DayRegistry {
        &self.days
    }

    pub fn day(&self, day_number: u32) -> Option<&Day> {
        self.days.get(day_number)
    }

    pub fn ledger(&self) -> &MissedDayLedger {
        &self.ledger
    }

    /// Verify the structural invariants listed in the module docs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let broken = |message: String| ValidationError::BrokenInvariant {
            challenge_id: self.id.clone(),
            message,
        };

        if self.days.len() != self.total_days as usize {
            return Err(broken(format!(
                "{} slots recorded but total_days is {}",
                self.days.len(),
                self.total_days
            )));
        }

        let mut ids = HashSet::new();
        for (index, day) in self.days.iter().enumerate() {
            let expected = index as u32 + 1;
            if day.day_number != expected {
                return Err(broken(format!(
                    "slot {expected} carries day number {}",
                    day.day_number
                )));
            }
            if day.challenge_id != self.id {
                return Err(broken(format!("day {expected} belongs to {}", day.challenge_id)));
            }
            if !ids.insert(day.id.as_str()) {
                return Err(broken(format!("duplicate day id {}", day.id)));
            }
            if day.status == DayStatus::Missed && !self.ledger.contains_missed(&day.id) {
                return Err(broken(format!("missed day {expected} is not in the ledger")));
            }
        }

        let mut queued = HashSet::new();
        for id in self.ledger.missed_days() {
            if !queued.insert(id) {
                return Err(broken(format!("day {id} queued twice")));
            }
            match self.days.find(id) {
                Some(day) if day.status == DayStatus::Missed => {}
                Some(day) => {
                    return Err(broken(format!(
                        "queued day {} is {}",
                        day.day_number, day.status
                    )))
                }
                None => return Err(broken(format!("queued day {id} does not exist"))),
            }
        }

        let mut makeups = HashSet::new();
        for (missed, makeup) in self.ledger.compensated_days() {
            match self.days.find(missed) {
                Some(day) if day.status == DayStatus::Compensated => {}
                _ => return Err(broken(format!("compensation key {missed} is not compensated"))),
            }
            match self.days.find(makeup) {
                Some(day) if day.is_extension_day => {}
                Some(day) => {
                    return Err(broken(format!(
                        "day {} compensates {missed} but is not a make-up day",
                        day.day_number
                    )))
                }
                None => return Err(broken(format!("make-up day {makeup} does not exist"))),
            }
            if !makeups.insert(makeup.as_str()) {
                return Err(broken(format!("make-up day {makeup} used twice")));
            }
        }

        Ok(())
    }
}
