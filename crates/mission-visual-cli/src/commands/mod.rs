pub mod challenge;
pub mod config;
pub mod day;
pub mod makeup;
pub mod session;
pub mod settings;

use std::error::Error;
use std::sync::{Arc, Mutex};

use mission_visual_core::{
    ChallengeManager, Config, LifecycleEvent, SharedNotificationCenter, SqliteStore,
    StaticSession, SystemClock,
};
use serde::Serialize;
use tracing::debug;

/// Per-invocation settings shared by all commands.
pub struct Context {
    user: String,
}

/// A manager wired to the on-disk store plus the notifications it produced.
///
/// Every invocation is one session: opening a workspace runs missed-day
/// detection over the user's active challenges before any command.
pub struct Workspace {
    pub manager: ChallengeManager,
    pub config: Config,
    /// Events produced by the start-of-session detection
    pub startup_events: Vec<LifecycleEvent>,
    center: SharedNotificationCenter,
}

impl Context {
    pub fn new(user: String) -> Self {
        Self { user }
    }

    pub fn open(&self) -> Result<Workspace, Box<dyn Error>> {
        let config = Config::load()?;
        let timezone = config.timezone_for(&self.user)?;
        debug!(user = %self.user, %timezone, "opening workspace");
        let store = SqliteStore::open()?;
        let center: SharedNotificationCenter = Arc::new(Mutex::new(config.notification_center()));
        let mut manager = ChallengeManager::new(
            Box::new(store),
            Arc::new(SystemClock),
            Box::new(StaticSession::signed_in(self.user.clone())),
            Box::new(center.clone()),
        )
        .with_timezone(timezone)
        .with_policy(config.policy());
        let startup_events = manager.initialize_session()?;
        Ok(Workspace {
            manager,
            config,
            startup_events,
            center,
        })
    }
}

impl Workspace {
    /// Print notifications raised during this invocation to stderr,
    /// oldest first, one JSON object per line.
    pub fn report(&self) -> Result<(), Box<dyn Error>> {
        let center = self.center.lock().unwrap_or_else(|e| e.into_inner());
        let pending: Vec<_> = center.notifications().collect();
        for notification in pending.into_iter().rev() {
            eprintln!("{}", serde_json::to_string(notification)?);
        }
        Ok(())
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
