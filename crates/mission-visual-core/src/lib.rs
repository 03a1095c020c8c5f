//! # Mission Visual Core Library
//!
//! This library provides the core logic for Mission Visual, a 30-day habit
//! challenge tracker. Hosts (the bundled CLI, or any other front end) drive it
//! through [`ChallengeManager`]; everything the manager needs from the outside
//! world is injected.
//!
//! ## Architecture
//!
//! - **Challenge lifecycle**: day state machine, missed-day ledger and the
//!   rules for completion, failure, make-up slots and restarts
//! - **Manager**: per-user collection with copy-on-write updates and
//!   whole-snapshot persistence
//! - **Storage**: SQLite snapshot store and TOML-based configuration
//! - **Notifications**: bounded, newest-first buffer with timed expiry
//!
//! ## Key Components
//!
//! - [`Challenge`]: one 30-day run and its days
//! - [`ChallengeManager`]: the operations a host calls
//! - [`SqliteStore`]: durable snapshot persistence
//! - [`Config`]: application configuration management
//! - [`NotificationCenter`]: notification buffer

pub mod challenge;
pub mod clock;
pub mod error;
pub mod events;
pub mod manager;
pub mod notify;
pub mod session;
pub mod storage;
pub mod timezone;

pub use challenge::{
    Challenge, ChallengeProgress, ChallengeStatus, Day, DayStatus, LifecyclePolicy,
    CHALLENGE_LENGTH_DAYS, MAX_MAKEUP_SLOTS_PER_CALL,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, Result, StoreError, ValidationError};
pub use events::LifecycleEvent;
pub use manager::{ChallengeManager, UserSettings};
pub use notify::{
    Notification, NotificationCenter, NotificationKind, NotificationSink, NullSink,
    SharedNotificationCenter,
};
pub use session::{Authenticator, StaticSession};
pub use storage::{ChallengeStore, Config, MemoryStore, SqliteStore};
pub use timezone::Timezone;
