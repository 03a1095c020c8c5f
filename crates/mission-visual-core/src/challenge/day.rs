//! Daily slots and their status machine.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Day status.
///
/// ```text
///   PENDING ──────> COMPLETED
///      |
///      | day boundary passed
///      v
///   MISSED ───────> COMPENSATED
///          make-up
/// ```
///
/// Valid transitions:
/// - PENDING → COMPLETED (user marks the day done)
/// - PENDING → MISSED (civil day ended without completion)
/// - MISSED → COMPENSATED (paired with a make-up slot)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    #[default]
    Pending,
    Completed,
    Missed,
    Compensated,
}

impl DayStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &DayStatus) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &[DayStatus] {
        match self {
            DayStatus::Pending => &[DayStatus::Completed, DayStatus::Missed],
            DayStatus::Missed => &[DayStatus::Compensated],
            DayStatus::Completed | DayStatus::Compensated => &[],
        }
    }

    /// Completed and compensated days both count toward finishing a challenge.
    pub fn is_resolved(&self) -> bool {
        matches!(self, DayStatus::Completed | DayStatus::Compensated)
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayStatus::Pending => "pending",
            DayStatus::Completed => "completed",
            DayStatus::Missed => "missed",
            DayStatus::Compensated => "compensated",
        };
        f.write_str(name)
    }
}

/// One calendar slot of a challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Day {
    pub id: String,
    pub challenge_id: String,
    /// 1-based, contiguous within the challenge
    pub day_number: u32,
    /// Nominal instant of the calendar day this slot covers
    pub scheduled_at: DateTime<Utc>,
    pub status: DayStatus,
    #[serde(default)]
    pub note: String,
    /// Opaque references to proof attachments
    #[serde(default)]
    pub attachments: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Slot appended as make-up capacity
    #[serde(default)]
    pub is_extension_day: bool,
    /// Missed day: the make-up slot that resolved it.
    /// Make-up slot: the missed day it resolved.
    #[serde(default)]
    pub compensates_day: Option<String>,
}

impl Day {
    fn new(
        challenge_id: &str,
        day_number: u32,
        scheduled_at: DateTime<Utc>,
        is_extension_day: bool,
    ) -> Self {
        Self {
            id: format!("day-{}", uuid::Uuid::new_v4()),
            challenge_id: challenge_id.to_string(),
            day_number,
            scheduled_at,
            status: DayStatus::Pending,
            note: String::new(),
            attachments: Vec::new(),
            completed_at: None,
            is_extension_day,
            compensates_day: None,
        }
    }

    /// Transition to a new status, rejecting anything outside the table.
    pub fn transition_to(&mut self, to: DayStatus) -> Result<()> {
        if !self.status.can_transition_to(&to) {
            return Err(CoreError::InvalidTransition {
                day_number: self.day_number,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Distance covered by `slots` consecutive slots.
pub(crate) fn slot_spacing(slots: u32) -> Duration {
    Duration::days(i64::from(slots))
}

/// Ordered slots of one challenge, ascending by `day_number`.
///
/// Slots are only ever appended; nothing removes or renumbers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DayRegistry {
    days: Vec<Day>,
}

impl DayRegistry {
    /// `count` pending slots starting at `start_at`, one per day.
    pub(crate) fn schedule(challenge_id: &str, start_at: DateTime<Utc>, count: u32) -> Self {
        let days = (1..=count)
            .map(|n| Day::new(challenge_id, n, start_at + slot_spacing(n - 1), false))
            .collect();
        Self { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Day> {
        self.days.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Day> {
        self.days.iter_mut()
    }

    pub fn as_slice(&self) -> &[Day] {
        &self.days
    }

    pub fn last(&self) -> Option<&Day> {
        self.days.last()
    }

    /// Lookup by sequence number.
    pub fn get(&self, day_number: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.day_number == day_number)
    }

    pub(crate) fn get_mut(&mut self, day_number: u32) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.day_number == day_number)
    }

    /// Lookup by day id.
    pub fn find(&self, id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.id == id)
    }

    pub fn count(&self, status: DayStatus) -> usize {
        self.days.iter().filter(|d| d.status == status).count()
    }

    pub fn resolved_count(&self) -> usize {
        self.days.iter().filter(|d| d.status.is_resolved()).count()
    }

    /// Append `count` make-up slots after the current last slot.
    ///
    /// Returns the ids of the new slots in order.
    pub(crate) fn append_makeup(
        &mut self,
        challenge_id: &str,
        count: u32,
        fallback_start: DateTime<Utc>,
    ) -> Vec<String> {
        let base = self
            .days
            .last()
            .map(|d| d.scheduled_at)
            .unwrap_or(fallback_start - slot_spacing(1));
        let first_number = self.days.len() as u32 + 1;
        let mut ids = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let day = Day::new(
                challenge_id,
                first_number + offset,
                base + slot_spacing(offset + 1),
                true,
            );
            ids.push(day.id.clone());
            self.days.push(day);
        }
        ids
    }
}

impl<'a> IntoIterator for &'a DayRegistry {
    type Item = &'a Day;
    type IntoIter = std::slice::Iter<'a, Day>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}
