mod config;
pub mod database;
mod memory;

pub use config::{ChallengeConfig, Config, NotificationsConfig, UserConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::challenge::Challenge;
use crate::error::StoreError;

/// Whole-collection snapshot persistence.
///
/// The manager always saves the complete, updated collection of one user;
/// there are no partial updates.
pub trait ChallengeStore: Send {
    fn load_challenges(&self, user_id: &str) -> Result<Vec<Challenge>, StoreError>;

    fn save_challenges(&mut self, user_id: &str, challenges: &[Challenge]) -> Result<(), StoreError>;

    /// Owner of a challenge id, when the backend can tell.
    fn owner_of(&self, _challenge_id: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}

/// Returns the data directory.
///
/// `MISSION_VISUAL_DATA_DIR` wins when set. Otherwise
/// `~/.config/mission-visual[-dev]/` based on MISSION_VISUAL_ENV
/// (set MISSION_VISUAL_ENV=dev to use the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("MISSION_VISUAL_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("MISSION_VISUAL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mission-visual-dev")
            } else {
                base_dir.join("mission-visual")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
