//! Challenge lifecycle controller.
//!
//! Each command validates its preconditions before touching any field, so a
//! rejected command leaves the challenge unchanged. Commands return the
//! lifecycle events they produced; persisting and announcing them is the
//! caller's job.
//!
//! ## State Transitions
//!
//! ```text
//! Active -> Completed   (every slot completed or compensated)
//! Active -> Failed      (manual, or a make-up slot was missed)
//! Active -> Archived    (restart)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::day::DayStatus;
use super::{Challenge, ChallengeStatus, CHALLENGE_LENGTH_DAYS};
use crate::error::{CoreError, DayRef, Result, ValidationError};
use crate::events::LifecycleEvent;
use crate::timezone::{has_crossed_midnight, Timezone};

/// Upper bound for one `add_makeup_slots` call.
pub const MAX_MAKEUP_SLOTS_PER_CALL: u32 = CHALLENGE_LENGTH_DAYS;

/// Knobs for automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    /// Fail the challenge when a make-up slot itself is missed.
    pub fail_on_missed_makeup: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            fail_on_missed_makeup: true,
        }
    }
}

impl Challenge {
    fn ensure_active(&self) -> Result<()> {
        if self.status != ChallengeStatus::Active {
            return Err(CoreError::ChallengeNotActive {
                challenge_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Mark a pending day as done, then check whether the challenge finished.
    pub fn complete_day(
        &mut self,
        day_number: u32,
        note: impl Into<String>,
        attachments: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<LifecycleEvent>> {
        self.ensure_active()?;
        let challenge_id = self.id.clone();
        let day = self
            .days
            .get_mut(day_number)
            .ok_or_else(|| CoreError::DayNotFound {
                challenge_id: challenge_id.clone(),
                day: DayRef::Number(day_number),
            })?;

        day.transition_to(DayStatus::Completed)?;
        day.note = note.into();
        day.attachments = attachments;
        day.completed_at = Some(now);
        info!(challenge_id = %challenge_id, day_number, "day completed");

        let mut events = vec![LifecycleEvent::DayCompleted {
            challenge_id,
            day_number,
            at: now,
        }];
        events.extend(self.evaluate_completion(now));
        Ok(events)
    }

    /// Move every overdue pending day to `missed` and queue it.
    ///
    /// A day is overdue when its scheduled instant is before `now` and its
    /// civil date in `tz` differs from that of `now`. Scanning in day order
    /// keeps the ledger FIFO. Running again with the same `now` changes
    /// nothing. Challenges that are no longer active are left frozen.
    pub fn detect_missed(
        &mut self,
        now: DateTime<Utc>,
        tz: Timezone,
        policy: LifecyclePolicy,
    ) -> Result<Vec<LifecycleEvent>> {
        if !self.is_active() {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        let mut missed_makeup = false;
        for day in self.days.iter_mut() {
            if day.status != DayStatus::Pending
                || day.scheduled_at >= now
                || !has_crossed_midnight(day.scheduled_at, now, tz)
            {
                continue;
            }
            day.transition_to(DayStatus::Missed)?;
            self.ledger.push_missed(&day.id);
            missed_makeup |= day.is_extension_day;
            events.push(LifecycleEvent::DayMissed {
                challenge_id: self.id.clone(),
                day_id: day.id.clone(),
                day_number: day.day_number,
                is_extension_day: day.is_extension_day,
                at: now,
            });
        }
        debug!(
            challenge_id = %self.id,
            newly_missed = events.len(),
            queued = self.ledger.missed_len(),
            "missed-day scan"
        );

        if missed_makeup && policy.fail_on_missed_makeup {
            events.extend(self.fail(now)?);
        }
        Ok(events)
    }

    /// Resolve the oldest missed day with a make-up slot.
    ///
    /// The head of the ledger is always the day resolved; callers cannot pick
    /// a specific missed day. Only appended make-up slots qualify, and the
    /// slot keeps its own status.
    pub fn compensate(
        &mut self,
        makeup_day_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<LifecycleEvent>> {
        self.ensure_active()?;
        let missed_id = self
            .ledger
            .head()
            .ok_or_else(|| CoreError::NothingToCompensate(self.id.clone()))?
            .to_string();

        let makeup = self
            .days
            .find(makeup_day_id)
            .ok_or_else(|| CoreError::DayNotFound {
                challenge_id: self.id.clone(),
                day: DayRef::Id(makeup_day_id.to_string()),
            })?;
        if let Some(resolved) = self.ledger.resolved_by(makeup_day_id) {
            return Err(CoreError::MakeupAlreadyUsed {
                makeup_day_id: makeup_day_id.to_string(),
                compensates: resolved.to_string(),
            });
        }
        if !makeup.is_extension_day {
            return Err(CoreError::NotAMakeupDay {
                challenge_id: self.id.clone(),
                day_number: makeup.day_number,
            });
        }
        if !matches!(makeup.status, DayStatus::Pending | DayStatus::Completed) {
            return Err(ValidationError::InvalidValue {
                field: "makeup_day_id".into(),
                message: format!("day {} is {} and cannot make up for another day", makeup.day_number, makeup.status),
            }
            .into());
        }

        let missed = self
            .days
            .find_mut(&missed_id)
            .ok_or_else(|| ValidationError::BrokenInvariant {
                challenge_id: self.id.clone(),
                message: format!("queued day {missed_id} does not exist"),
            })?;
        missed.transition_to(DayStatus::Compensated)?;
        missed.compensates_day = Some(makeup_day_id.to_string());
        let missed_day_number = missed.day_number;

        if let Some(makeup) = self.days.find_mut(makeup_day_id) {
            makeup.compensates_day = Some(missed_id.clone());
        }
        self.ledger.resolve_head(makeup_day_id);
        info!(
            challenge_id = %self.id,
            missed_day_number,
            makeup_day_id,
            "missed day compensated"
        );

        let mut events = vec![LifecycleEvent::MissedDayCompensated {
            challenge_id: self.id.clone(),
            missed_day_id: missed_id,
            makeup_day_id: makeup_day_id.to_string(),
            at: now,
        }];
        events.extend(self.evaluate_completion(now));
        Ok(events)
    }

    /// Complete the challenge once every slot is completed or compensated.
    pub fn evaluate_completion(&mut self, now: DateTime<Utc>) -> Option<LifecycleEvent> {
        if !self.is_active() || self.days.resolved_count() != self.total_days as usize {
            return None;
        }
        self.status = ChallengeStatus::Completed;
        self.completed_at = Some(now);
        info!(challenge_id = %self.id, total_days = self.total_days, "challenge completed");
        Some(LifecycleEvent::ChallengeCompleted {
            challenge_id: self.id.clone(),
            total_days: self.total_days,
            at: now,
        })
    }

    /// Append `count` pending make-up slots after the last slot.
    pub fn add_makeup_slots(&mut self, count: u32, now: DateTime<Utc>) -> Result<Vec<LifecycleEvent>> {
        self.ensure_active()?;
        if count == 0 || count > MAX_MAKEUP_SLOTS_PER_CALL {
            return Err(ValidationError::InvalidValue {
                field: "count".into(),
                message: format!("between 1 and {MAX_MAKEUP_SLOTS_PER_CALL} make-up days can be added at once"),
            }
            .into());
        }
        let total_days = self.total_days.checked_add(count).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "count".into(),
                message: format!("challenge already spans {} days", self.total_days),
            }
        })?;

        let day_ids = self.days.append_makeup(&self.id, count, self.start_at);
        self.total_days = total_days;
        if let Some(last) = self.days.last() {
            self.end_at = last.scheduled_at;
        }
        info!(challenge_id = %self.id, count, total_days = self.total_days, "make-up slots added");

        Ok(vec![LifecycleEvent::MakeupSlotsAdded {
            challenge_id: self.id.clone(),
            day_ids,
            total_days: self.total_days,
            at: now,
        }])
    }

    /// Give up on the challenge.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<Vec<LifecycleEvent>> {
        self.ensure_active()?;
        self.status = ChallengeStatus::Failed;
        info!(challenge_id = %self.id, "challenge failed");
        Ok(vec![LifecycleEvent::ChallengeFailed {
            challenge_id: self.id.clone(),
            at: now,
        }])
    }

    /// Archive this challenge and return a fresh 30-day cycle with the same
    /// text, starting at `now`. The archived history is never touched again.
    pub fn restart(&mut self, now: DateTime<Utc>) -> Result<(Challenge, Vec<LifecycleEvent>)> {
        self.ensure_active()?;
        self.status = ChallengeStatus::Archived;
        let fresh = Challenge::new(
            self.user_id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.execution_details.clone(),
            now,
            now,
        );
        info!(archived_id = %self.id, challenge_id = %fresh.id, "challenge restarted");
        let events = vec![LifecycleEvent::ChallengeRestarted {
            archived_id: self.id.clone(),
            challenge_id: fresh.id.clone(),
            at: now,
        }];
        Ok((fresh, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn challenge() -> Challenge {
        Challenge::new("u1", "Run", "Run every day", "5 km", start(), start())
    }

    fn detect(c: &mut Challenge, now: DateTime<Utc>) -> Vec<LifecycleEvent> {
        c.detect_missed(now, Timezone::UTC, LifecyclePolicy::default())
            .unwrap()
    }

    #[test]
    fn completing_one_day_keeps_challenge_active() {
        let mut c = challenge();
        let events = c.complete_day(1, "done", vec![], start()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(c.status(), ChallengeStatus::Active);
        assert_eq!(c.days().resolved_count(), 1);
        let day = c.day(1).unwrap();
        assert_eq!(day.note, "done");
        assert_eq!(day.completed_at, Some(start()));
    }

    #[test]
    fn completing_twice_is_an_invalid_transition() {
        let mut c = challenge();
        c.complete_day(2, "", vec![], start()).unwrap();
        let err = c.complete_day(2, "again", vec![], start()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { day_number: 2, .. }));
        assert_eq!(c.day(2).unwrap().note, "");
    }

    #[test]
    fn completing_unknown_day_is_not_found() {
        let mut c = challenge();
        let err = c.complete_day(31, "", vec![], start()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DayNotFound { day: DayRef::Number(31), .. }
        ));
    }

    #[test]
    fn missed_days_cannot_be_completed() {
        let mut c = challenge();
        detect(&mut c, start() + Duration::days(1));
        assert_eq!(c.day(1).unwrap().status, DayStatus::Missed);
        assert!(matches!(
            c.complete_day(1, "", vec![], start()),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn detection_waits_for_the_civil_day_to_end() {
        let mut c = challenge();
        // Later the same day: nothing is overdue yet.
        assert!(detect(&mut c, start() + Duration::hours(14)).is_empty());
        // Just past midnight UTC: day 1 is overdue.
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap();
        let events = detect(&mut c, now);
        assert_eq!(events.len(), 1);
        assert_eq!(c.ledger().missed_len(), 1);
        assert_eq!(c.day(2).unwrap().status, DayStatus::Pending);
    }

    #[test]
    fn detection_respects_owner_timezone() {
        let mut c = challenge();
        let la: Timezone = "America/Los_Angeles".parse().unwrap();
        // 09:00 UTC is 01:00 PST; 07:00 UTC next day is 23:00 PST the same
        // civil day as the slot.
        let now = start() + Duration::hours(22);
        assert!(c.detect_missed(now, la, LifecyclePolicy::default()).unwrap().is_empty());
        assert!(!detect(&mut c, now).is_empty());
    }

    #[test]
    fn detection_is_idempotent() {
        let mut c = challenge();
        let now = start() + Duration::days(5) + Duration::hours(1);
        let first = detect(&mut c, now);
        assert_eq!(first.len(), 5);
        let snapshot = c.clone();
        assert!(detect(&mut c, now).is_empty());
        assert_eq!(c, snapshot);
    }

    #[test]
    fn compensation_resolves_the_oldest_missed_day() {
        let mut c = challenge();
        detect(&mut c, start() + Duration::days(3) + Duration::hours(1));
        let m: Vec<String> = c.ledger().missed_days().map(String::from).collect();
        assert_eq!(m.len(), 3);

        c.add_makeup_slots(3, start()).unwrap();
        // Pass the last make-up slot; the head is still resolved.
        let day33 = c.day(33).unwrap().id.clone();
        c.compensate(&day33, start()).unwrap();

        assert_eq!(c.ledger().missed_days().collect::<Vec<_>>(), vec![m[1].as_str(), m[2].as_str()]);
        assert_eq!(c.day(1).unwrap().status, DayStatus::Compensated);
        assert_eq!(c.day(1).unwrap().compensates_day.as_deref(), Some(day33.as_str()));
        assert_eq!(c.day(33).unwrap().compensates_day.as_deref(), Some(m[0].as_str()));
        assert_eq!(c.day(33).unwrap().status, DayStatus::Pending);
        c.validate().unwrap();
    }

    #[test]
    fn compensation_requires_a_missed_day() {
        let mut c = challenge();
        c.add_makeup_slots(1, start()).unwrap();
        let id = c.day(31).unwrap().id.clone();
        assert!(matches!(
            c.compensate(&id, start()),
            Err(CoreError::NothingToCompensate(_))
        ));
    }

    #[test]
    fn makeup_slot_is_used_once() {
        let mut c = challenge();
        detect(&mut c, start() + Duration::days(2) + Duration::hours(1));
        c.add_makeup_slots(1, start()).unwrap();
        let id = c.day(31).unwrap().id.clone();
        c.compensate(&id, start()).unwrap();
        let before = c.clone();
        assert!(matches!(
            c.compensate(&id, start()),
            Err(CoreError::MakeupAlreadyUsed { .. })
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn compensation_with_unknown_slot_changes_nothing() {
        let mut c = challenge();
        detect(&mut c, start() + Duration::days(1) + Duration::hours(1));
        let before = c.clone();
        assert!(matches!(
            c.compensate("day-nope", start()),
            Err(CoreError::DayNotFound { .. })
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn makeup_slots_extend_the_challenge() {
        let mut c = challenge();
        c.add_makeup_slots(2, start()).unwrap();
        assert_eq!(c.total_days(), 32);
        assert_eq!(c.days().len(), 32);
        assert_eq!(c.end_at(), start() + Duration::days(31));
        assert!(matches!(
            c.add_makeup_slots(0, start()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn completion_requires_every_slot_resolved() {
        let mut c = challenge();
        for n in 1..=29 {
            c.complete_day(n, "", vec![], start()).unwrap();
        }
        assert!(c.evaluate_completion(start()).is_none());
        let events = c.complete_day(30, "", vec![], start()).unwrap();
        assert!(matches!(events.last(), Some(LifecycleEvent::ChallengeCompleted { .. })));
        assert_eq!(c.status(), ChallengeStatus::Completed);
        assert_eq!(c.completed_at(), Some(start()));
        // Terminal: nothing else is accepted.
        assert!(c.add_makeup_slots(1, start()).is_err());
        assert!(c.fail(start()).is_err());
    }

    #[test]
    fn compensation_can_finish_the_challenge() {
        let mut c = challenge();
        let now = start() + Duration::days(1) + Duration::hours(1);
        detect(&mut c, now);
        for n in 2..=30 {
            c.complete_day(n, "", vec![], now).unwrap();
        }
        c.add_makeup_slots(1, now).unwrap();
        c.complete_day(31, "", vec![], now).unwrap();
        assert!(c.is_active());
        let id = c.day(31).unwrap().id.clone();
        let events = c.compensate(&id, now).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(c.status(), ChallengeStatus::Completed);
    }

    #[test]
    fn missed_makeup_slot_fails_the_challenge() {
        let mut c = challenge();
        c.add_makeup_slots(1, start()).unwrap();
        for n in 1..=30 {
            c.complete_day(n, "", vec![], start()).unwrap();
        }
        let events = detect(&mut c, start() + Duration::days(31));
        assert!(matches!(events.last(), Some(LifecycleEvent::ChallengeFailed { .. })));
        assert_eq!(c.status(), ChallengeStatus::Failed);
    }

    #[test]
    fn missed_makeup_slot_is_tolerated_when_policy_allows() {
        let mut c = challenge();
        c.add_makeup_slots(1, start()).unwrap();
        let policy = LifecyclePolicy {
            fail_on_missed_makeup: false,
        };
        c.detect_missed(start() + Duration::days(31), Timezone::UTC, policy)
            .unwrap();
        assert!(c.is_active());
        assert_eq!(c.ledger().missed_len(), 31);
    }

    #[test]
    fn regular_day_cannot_stand_in_as_makeup() {
        let mut c = challenge();
        let now = start() + Duration::days(1) + Duration::hours(1);
        detect(&mut c, now);
        for n in 2..=30 {
            c.complete_day(n, "", vec![], now).unwrap();
        }
        let day2 = c.day(2).unwrap().id.clone();
        let before = c.clone();
        assert!(matches!(
            c.compensate(&day2, now),
            Err(CoreError::NotAMakeupDay { day_number: 2, .. })
        ));
        assert_eq!(c, before);
        assert!(c.is_active());
        assert_eq!(c.progress().resolved, 29);
    }

    #[test]
    fn makeup_slot_count_is_bounded() {
        let mut c = challenge();
        let before = c.clone();
        for count in [MAX_MAKEUP_SLOTS_PER_CALL + 1, u32::MAX] {
            assert!(matches!(
                c.add_makeup_slots(count, start()),
                Err(CoreError::Validation(ValidationError::InvalidValue { .. }))
            ));
        }
        assert_eq!(c, before);

        c.add_makeup_slots(MAX_MAKEUP_SLOTS_PER_CALL, start()).unwrap();
        assert_eq!(c.total_days(), 30 + MAX_MAKEUP_SLOTS_PER_CALL);
        assert_eq!(c.end_at(), start() + Duration::days(59));
        c.validate().unwrap();
    }

    #[test]
    fn restart_archives_and_starts_fresh() {
        let mut c = challenge();
        c.complete_day(1, "", vec![], start()).unwrap();
        let later = start() + Duration::days(3);
        let (fresh, events) = c.restart(later).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(c.status(), ChallengeStatus::Archived);
        assert_ne!(fresh.id, c.id);
        assert_eq!(fresh.title, c.title);
        assert_eq!(fresh.start_at, later);
        assert_eq!(fresh.days().count(DayStatus::Pending), 30);
        // Archived challenges are frozen.
        assert!(detect(&mut c, later).is_empty());
        assert!(c.restart(later).is_err());
    }
}
