//! Challenge collection manager.
//!
//! Owns no challenge state of its own: every operation loads the signed-in
//! user's collection from the store, works on a copy of the target
//! challenge, validates the result and writes the whole collection back.
//! Notifications go out only after the write succeeded, so a failed save
//! leaves nothing announced and nothing half-applied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::challenge::{Challenge, ChallengeProgress, ChallengeStatus, LifecyclePolicy};
use crate::clock::Clock;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::LifecycleEvent;
use crate::notify::NotificationSink;
use crate::session::Authenticator;
use crate::storage::ChallengeStore;
use crate::timezone::Timezone;

/// Per-user settings relevant to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub timezone: Timezone,
}

pub struct ChallengeManager {
    store: Box<dyn ChallengeStore>,
    clock: Arc<dyn Clock>,
    session: Box<dyn Authenticator>,
    sink: Box<dyn NotificationSink>,
    timezone: Timezone,
    policy: LifecyclePolicy,
    current: Option<String>,
}

impl ChallengeManager {
    pub fn new(
        store: Box<dyn ChallengeStore>,
        clock: Arc<dyn Clock>,
        session: Box<dyn Authenticator>,
        sink: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            clock,
            session,
            sink,
            timezone: Timezone::UTC,
            policy: LifecyclePolicy::default(),
            current: None,
        }
    }

    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn settings(&self) -> Result<UserSettings> {
        Ok(UserSettings {
            user_id: self.user_id()?,
            timezone: self.timezone,
        })
    }

    pub fn update_timezone(&mut self, timezone: Timezone) -> Result<UserSettings> {
        let user_id = self.user_id()?;
        self.timezone = timezone;
        info!(user_id = %user_id, timezone = %timezone, "timezone updated");
        Ok(UserSettings { user_id, timezone })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The user's challenges, optionally restricted to one status.
    pub fn challenges(&self, status: Option<ChallengeStatus>) -> Result<Vec<Challenge>> {
        let user_id = self.user_id()?;
        Ok(self
            .load(&user_id)?
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .filter(|c| status.map_or(true, |s| c.status() == s))
            .collect())
    }

    pub fn active_challenges(&self) -> Result<Vec<Challenge>> {
        self.challenges(Some(ChallengeStatus::Active))
    }

    pub fn completed_challenges(&self) -> Result<Vec<Challenge>> {
        self.challenges(Some(ChallengeStatus::Completed))
    }

    pub fn failed_challenges(&self) -> Result<Vec<Challenge>> {
        self.challenges(Some(ChallengeStatus::Failed))
    }

    pub fn challenge(&self, challenge_id: &str) -> Result<Challenge> {
        let user_id = self.user_id()?;
        let collection = self.load(&user_id)?;
        let pos = self.locate(&user_id, &collection, challenge_id)?;
        Ok(collection[pos].clone())
    }

    pub fn progress(&self, challenge_id: &str) -> Result<ChallengeProgress> {
        Ok(self.challenge(challenge_id)?.progress())
    }

    pub fn select_current(&mut self, challenge_id: &str) -> Result<Challenge> {
        let challenge = self.challenge(challenge_id)?;
        self.current = Some(challenge.id.clone());
        Ok(challenge)
    }

    /// Currently selected challenge, if it still exists.
    pub fn current_challenge(&self) -> Result<Option<Challenge>> {
        let Some(id) = self.current.as_deref() else {
            return Ok(None);
        };
        match self.challenge(id) {
            Ok(challenge) => Ok(Some(challenge)),
            Err(CoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a 30-day challenge starting at `start_at` and make it current.
    pub fn create_challenge(
        &mut self,
        title: &str,
        description: &str,
        execution_details: &str,
        start_at: DateTime<Utc>,
    ) -> Result<Challenge> {
        let user_id = self.user_id()?;
        if title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "title must not be empty".into(),
            }
            .into());
        }

        let mut collection = self.load(&user_id)?;
        let now = self.clock.now();
        let challenge = Challenge::new(
            user_id.as_str(),
            title.trim(),
            description,
            execution_details,
            start_at,
            now,
        );
        challenge.validate()?;
        collection.push(challenge.clone());

        let event = LifecycleEvent::ChallengeCreated {
            challenge_id: challenge.id.clone(),
            at: now,
        };
        self.commit(&user_id, &collection, vec![event])?;
        self.current = Some(challenge.id.clone());
        Ok(challenge)
    }

    pub fn complete_day(
        &mut self,
        challenge_id: &str,
        day_number: u32,
        note: &str,
        attachments: Vec<String>,
    ) -> Result<Challenge> {
        self.mutate(challenge_id, |challenge, now| {
            challenge.complete_day(day_number, note, attachments, now)
        })
    }

    /// Mark overdue days of one challenge as missed, as of `clock.now()`.
    pub fn detect_missed(&mut self, challenge_id: &str) -> Result<Challenge> {
        let (tz, policy) = (self.timezone, self.policy);
        self.mutate(challenge_id, |challenge, now| {
            challenge.detect_missed(now, tz, policy)
        })
    }

    /// Run missed-day detection over every active challenge of the user.
    ///
    /// Writes at most one snapshot, and none when nothing changed.
    pub fn initialize_session(&mut self) -> Result<Vec<LifecycleEvent>> {
        let user_id = self.user_id()?;
        let mut collection = self.load(&user_id)?;
        let now = self.clock.now();
        let mut events = Vec::new();

        for challenge in collection.iter_mut().filter(|c| c.is_active()) {
            let mut updated = challenge.clone();
            let produced = updated.detect_missed(now, self.timezone, self.policy)?;
            if produced.is_empty() {
                continue;
            }
            updated.validate()?;
            *challenge = updated;
            events.extend(produced);
        }

        debug!(user_id = %user_id, events = events.len(), "session initialized");
        if !events.is_empty() {
            self.commit(&user_id, &collection, events.clone())?;
        }
        Ok(events)
    }

    pub fn add_makeup_slots(&mut self, challenge_id: &str, count: u32) -> Result<Challenge> {
        self.mutate(challenge_id, |challenge, now| {
            challenge.add_makeup_slots(count, now)
        })
    }

    /// Resolve the oldest missed day with `makeup_day_id`.
    pub fn compensate(&mut self, challenge_id: &str, makeup_day_id: &str) -> Result<Challenge> {
        self.mutate(challenge_id, |challenge, now| {
            challenge.compensate(makeup_day_id, now)
        })
    }

    pub fn fail_challenge(&mut self, challenge_id: &str) -> Result<Challenge> {
        self.mutate(challenge_id, |challenge, now| challenge.fail(now))
    }

    /// Archive a challenge and start a fresh cycle with the same text.
    ///
    /// Returns the new challenge, which becomes current.
    pub fn restart_challenge(&mut self, challenge_id: &str) -> Result<Challenge> {
        let user_id = self.user_id()?;
        let mut collection = self.load(&user_id)?;
        let pos = self.locate(&user_id, &collection, challenge_id)?;
        let now = self.clock.now();

        let mut archived = collection[pos].clone();
        let (fresh, events) = archived.restart(now)?;
        archived.validate()?;
        fresh.validate()?;
        collection[pos] = archived;
        collection.push(fresh.clone());

        self.commit(&user_id, &collection, events)?;
        self.current = Some(fresh.id.clone());
        Ok(fresh)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn user_id(&self) -> Result<String> {
        if !self.session.is_authenticated() {
            return Err(CoreError::Unauthenticated);
        }
        self.session
            .current_user_id()
            .ok_or(CoreError::Unauthenticated)
    }

    fn load(&self, user_id: &str) -> Result<Vec<Challenge>> {
        Ok(self.store.load_challenges(user_id)?)
    }

    /// Index of `challenge_id` in the user's collection, with the
    /// ownership check applied.
    fn locate(&self, user_id: &str, collection: &[Challenge], challenge_id: &str) -> Result<usize> {
        if let Some(pos) = collection.iter().position(|c| c.id == challenge_id) {
            if collection[pos].user_id != user_id {
                return Err(CoreError::Forbidden {
                    challenge_id: challenge_id.to_string(),
                });
            }
            return Ok(pos);
        }
        match self.store.owner_of(challenge_id)? {
            Some(owner) if owner != user_id => {
                warn!(user_id, challenge_id, "access to foreign challenge refused");
                Err(CoreError::Forbidden {
                    challenge_id: challenge_id.to_string(),
                })
            }
            _ => Err(CoreError::NotFound(challenge_id.to_string())),
        }
    }

    /// Copy-on-write update of one challenge.
    fn mutate<F>(&mut self, challenge_id: &str, apply: F) -> Result<Challenge>
    where
        F: FnOnce(&mut Challenge, DateTime<Utc>) -> Result<Vec<LifecycleEvent>>,
    {
        let user_id = self.user_id()?;
        let mut collection = self.load(&user_id)?;
        let pos = self.locate(&user_id, &collection, challenge_id)?;

        let mut updated = collection[pos].clone();
        let events = apply(&mut updated, self.clock.now())?;
        if updated == collection[pos] {
            return Ok(updated);
        }
        updated.validate()?;
        collection[pos] = updated.clone();

        self.commit(&user_id, &collection, events)?;
        Ok(updated)
    }

    fn commit(
        &mut self,
        user_id: &str,
        collection: &[Challenge],
        events: Vec<LifecycleEvent>,
    ) -> Result<()> {
        if let Err(err) = self.store.save_challenges(user_id, collection) {
            warn!(user_id, error = %err, "snapshot write failed; mutation not durable");
            return Err(err.into());
        }
        debug!(user_id, challenges = collection.len(), "snapshot saved");

        for event in events {
            debug!(challenge_id = event.challenge_id(), ?event, "lifecycle event");
            if let Some(notification) = event.to_notification() {
                self.sink.emit(notification);
            }
        }
        Ok(())
    }
}
