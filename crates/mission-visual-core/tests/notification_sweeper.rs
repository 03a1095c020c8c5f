//! Integration tests for the notification expiry sweeper.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use mission_visual_core::notify::spawn_expiry_sweeper;
use mission_visual_core::{
    Clock, ManualClock, Notification, NotificationCenter, NotificationKind, NotificationSink,
    SharedNotificationCenter,
};

fn setup() -> (SharedNotificationCenter, Arc<ManualClock>) {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let center = Arc::new(Mutex::new(NotificationCenter::new(10, Duration::seconds(5))));
    (center, Arc::new(ManualClock::new(start)))
}

#[tokio::test]
async fn test_sweeper_expires_due_notifications() {
    let (center, clock) = setup();
    let mut sink = center.clone();
    sink.emit(Notification::new(
        NotificationKind::Success,
        "Day 1 Completed!",
        "",
        clock.now(),
    ));
    sink.emit(Notification::new(
        NotificationKind::Info,
        "Later",
        "",
        clock.now() + Duration::seconds(10),
    ));

    let shared_clock: Arc<dyn Clock> = clock.clone();
    let handle = spawn_expiry_sweeper(center.clone(), shared_clock, StdDuration::from_millis(5));

    clock.advance(Duration::seconds(6));
    tokio::time::sleep(StdDuration::from_millis(100)).await;
    {
        let center = center.lock().unwrap();
        let titles: Vec<_> = center.notifications().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Later"]);
    }

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_aborted_sweeper_leaves_entries_alone() {
    let (center, clock) = setup();
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let handle = spawn_expiry_sweeper(center.clone(), shared_clock, StdDuration::from_millis(5));
    handle.abort();
    let _ = handle.await;

    center.clone().emit(Notification::new(
        NotificationKind::Warning,
        "Day 3 Missed",
        "",
        clock.now(),
    ));
    clock.advance(Duration::minutes(1));
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    assert_eq!(center.lock().unwrap().len(), 1);
    assert!(center.lock().unwrap().next_expiry().is_some());
}
