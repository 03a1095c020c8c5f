//! In-process store.
//!
//! Clones share the same backing map, so a host (or a test) can keep a handle
//! after giving one to the manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::ChallengeStore;
use crate::challenge::Challenge;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryInner {
    snapshots: HashMap<String, Vec<Challenge>>,
    saves: usize,
    fail_saves: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of successful snapshot writes so far.
    pub fn save_count(&self) -> usize {
        self.inner().saves
    }

    /// Make every following save fail until switched back.
    pub fn set_fail_saves(&self, fail: bool) {
        self.inner().fail_saves = fail;
    }

    /// Stored snapshot of one user.
    pub fn snapshot(&self, user_id: &str) -> Vec<Challenge> {
        self.inner()
            .snapshots
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl ChallengeStore for MemoryStore {
    fn load_challenges(&self, user_id: &str) -> Result<Vec<Challenge>, StoreError> {
        Ok(self.snapshot(user_id))
    }

    fn save_challenges(&mut self, user_id: &str, challenges: &[Challenge]) -> Result<(), StoreError> {
        let mut inner = self.inner();
        if inner.fail_saves {
            return Err(StoreError::Unavailable("memory store rejects writes".into()));
        }
        inner
            .snapshots
            .insert(user_id.to_string(), challenges.to_vec());
        inner.saves += 1;
        Ok(())
    }

    fn owner_of(&self, challenge_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner()
            .snapshots
            .iter()
            .find(|(_, challenges)| challenges.iter().any(|c| c.id == challenge_id))
            .map(|(user, _)| user.clone()))
    }
}
