use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::{Notification, NotificationKind};

/// Every challenge state change produces an event.
/// Hosts persist the snapshot first, then announce events as notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    ChallengeCreated {
        challenge_id: String,
        at: DateTime<Utc>,
    },
    DayCompleted {
        challenge_id: String,
        day_number: u32,
        at: DateTime<Utc>,
    },
    /// A pending day's civil date ended without completion.
    DayMissed {
        challenge_id: String,
        day_id: String,
        day_number: u32,
        is_extension_day: bool,
        at: DateTime<Utc>,
    },
    MissedDayCompensated {
        challenge_id: String,
        missed_day_id: String,
        makeup_day_id: String,
        at: DateTime<Utc>,
    },
    MakeupSlotsAdded {
        challenge_id: String,
        day_ids: Vec<String>,
        total_days: u32,
        at: DateTime<Utc>,
    },
    ChallengeCompleted {
        challenge_id: String,
        total_days: u32,
        at: DateTime<Utc>,
    },
    ChallengeFailed {
        challenge_id: String,
        at: DateTime<Utc>,
    },
    ChallengeRestarted {
        archived_id: String,
        challenge_id: String,
        at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn challenge_id(&self) -> &str {
        match self {
            LifecycleEvent::ChallengeCreated { challenge_id, .. }
            | LifecycleEvent::DayCompleted { challenge_id, .. }
            | LifecycleEvent::DayMissed { challenge_id, .. }
            | LifecycleEvent::MissedDayCompensated { challenge_id, .. }
            | LifecycleEvent::MakeupSlotsAdded { challenge_id, .. }
            | LifecycleEvent::ChallengeCompleted { challenge_id, .. }
            | LifecycleEvent::ChallengeFailed { challenge_id, .. }
            | LifecycleEvent::ChallengeRestarted { challenge_id, .. } => challenge_id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::ChallengeCreated { at, .. }
            | LifecycleEvent::DayCompleted { at, .. }
            | LifecycleEvent::DayMissed { at, .. }
            | LifecycleEvent::MissedDayCompensated { at, .. }
            | LifecycleEvent::MakeupSlotsAdded { at, .. }
            | LifecycleEvent::ChallengeCompleted { at, .. }
            | LifecycleEvent::ChallengeFailed { at, .. }
            | LifecycleEvent::ChallengeRestarted { at, .. } => *at,
        }
    }

    /// User-facing notification for this event, if it deserves one.
    pub fn to_notification(&self) -> Option<Notification> {
        let (kind, title, message) = match self {
            LifecycleEvent::ChallengeCreated { .. } => return None,
            LifecycleEvent::DayCompleted { day_number, .. } => (
                NotificationKind::Success,
                format!("Day {day_number} Completed!"),
                "Great job! Keep up the momentum.".to_string(),
            ),
            LifecycleEvent::DayMissed {
                day_number,
                is_extension_day,
                ..
            } => (
                NotificationKind::Warning,
                format!("Day {day_number} Missed"),
                if *is_extension_day {
                    "A make-up day slipped by.".to_string()
                } else {
                    "Add a make-up day to stay on track.".to_string()
                },
            ),
            LifecycleEvent::MissedDayCompensated { .. } => (
                NotificationKind::Success,
                "Make-up Day Completed!".to_string(),
                "You've successfully compensated for a missed day. Keep going!".to_string(),
            ),
            LifecycleEvent::MakeupSlotsAdded {
                day_ids,
                total_days,
                ..
            } => (
                NotificationKind::Info,
                "Make-up Days Added".to_string(),
                format!(
                    "{} make-up day(s) added. The challenge now spans {total_days} days.",
                    day_ids.len()
                ),
            ),
            LifecycleEvent::ChallengeCompleted { total_days, .. } => (
                NotificationKind::Success,
                "Challenge Completed!".to_string(),
                format!("Congratulations! You completed all {total_days} days."),
            ),
            LifecycleEvent::ChallengeFailed { .. } => (
                NotificationKind::Error,
                "Challenge Failed".to_string(),
                "You did not complete the make-up day. This challenge is now incomplete."
                    .to_string(),
            ),
            LifecycleEvent::ChallengeRestarted { .. } => (
                NotificationKind::Info,
                "Challenge Restarted".to_string(),
                "A fresh 30-day cycle starts today.".to_string(),
            ),
        };
        Some(Notification::new(kind, title, message, self.at()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = LifecycleEvent::DayCompleted {
            challenge_id: "c1".into(),
            day_number: 4,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DayCompleted");
        assert_eq!(json["day_number"], 4);
    }

    #[test]
    fn failure_maps_to_error_notification() {
        let at = Utc::now();
        let n = LifecycleEvent::ChallengeFailed {
            challenge_id: "c1".into(),
            at,
        }
        .to_notification()
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Error);
        assert_eq!(n.timestamp, at);
        assert!(!n.read);
    }

    #[test]
    fn creation_is_silent() {
        let event = LifecycleEvent::ChallengeCreated {
            challenge_id: "c1".into(),
            at: Utc::now(),
        };
        assert!(event.to_notification().is_none());
    }
}
