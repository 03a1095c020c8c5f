//! FIFO queue of unresolved missed days plus the compensation record.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Missed-day ledger of one challenge.
///
/// Ids enter at the tail in detection order, which is ascending day order,
/// and leave only from the head. Each resolved missed day maps to exactly
/// one make-up slot and no make-up slot is used twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MissedDayLedger {
    #[serde(default)]
    missed_days: VecDeque<String>,
    /// missed day id -> make-up day id
    #[serde(default)]
    compensated_days: BTreeMap<String, String>,
}

impl MissedDayLedger {
    /// Append a missed day to the tail. Returns false if it is already queued.
    pub(crate) fn push_missed(&mut self, day_id: &str) -> bool {
        if self.contains_missed(day_id) {
            return false;
        }
        self.missed_days.push_back(day_id.to_string());
        true
    }

    /// Oldest unresolved missed day.
    pub fn head(&self) -> Option<&str> {
        self.missed_days.front().map(String::as_str)
    }

    /// Pop the head and record it as compensated by `makeup_day_id`.
    pub(crate) fn resolve_head(&mut self, makeup_day_id: &str) -> Option<String> {
        let missed = self.missed_days.pop_front()?;
        self.compensated_days
            .insert(missed.clone(), makeup_day_id.to_string());
        Some(missed)
    }

    pub fn contains_missed(&self, day_id: &str) -> bool {
        self.missed_days.iter().any(|id| id == day_id)
    }

    pub fn missed_days(&self) -> impl Iterator<Item = &str> {
        self.missed_days.iter().map(String::as_str)
    }

    pub fn missed_len(&self) -> usize {
        self.missed_days.len()
    }

    pub fn is_clear(&self) -> bool {
        self.missed_days.is_empty()
    }

    pub fn compensated_days(&self) -> &BTreeMap<String, String> {
        &self.compensated_days
    }

    /// Make-up slot recorded for a missed day.
    pub fn compensation_for(&self, missed_day_id: &str) -> Option<&str> {
        self.compensated_days.get(missed_day_id).map(String::as_str)
    }

    /// Missed day already resolved by this make-up slot, if any.
    pub fn resolved_by(&self, makeup_day_id: &str) -> Option<&str> {
        self.compensated_days
            .iter()
            .find(|(_, makeup)| makeup.as_str() == makeup_day_id)
            .map(|(missed, _)| missed.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_idempotent() {
        let mut ledger = MissedDayLedger::default();
        assert!(ledger.push_missed("d5"));
        assert!(!ledger.push_missed("d5"));
        assert_eq!(ledger.missed_len(), 1);
    }

    #[test]
    fn resolves_in_fifo_order() {
        let mut ledger = MissedDayLedger::default();
        for id in ["m1", "m2", "m3"] {
            ledger.push_missed(id);
        }
        assert_eq!(ledger.resolve_head("x").as_deref(), Some("m1"));
        assert_eq!(ledger.missed_days().collect::<Vec<_>>(), vec!["m2", "m3"]);
        assert_eq!(ledger.compensation_for("m1"), Some("x"));
        assert_eq!(ledger.resolved_by("x"), Some("m1"));
        assert_eq!(ledger.resolved_by("m2"), None);
    }

    #[test]
    fn resolve_on_empty_ledger_is_none() {
        let mut ledger = MissedDayLedger::default();
        assert!(ledger.resolve_head("x").is_none());
        assert!(ledger.compensated_days().is_empty());
    }
}
