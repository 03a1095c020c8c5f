//! Core error types for mission-visual-core.
//!
//! This module defines the error hierarchy using thiserror. Lookups that miss
//! are reported as explicit errors rather than silently ignored, so hosts can
//! tell a stale UI reference apart from a successful no-op.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::challenge::{ChallengeStatus, DayStatus};

/// Core error type for mission-visual-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No challenge with this id exists for the current user
    #[error("Challenge not found: {0}")]
    NotFound(String),

    /// The challenge exists but has no matching day
    #[error("Day {day} not found in challenge {challenge_id}")]
    DayNotFound { challenge_id: String, day: DayRef },

    /// The challenge belongs to another user
    #[error("Challenge {challenge_id} is not owned by the current user")]
    Forbidden { challenge_id: String },

    /// No user is signed in
    #[error("Not authenticated")]
    Unauthenticated,

    /// A day status change outside the allowed table
    #[error("Day {day_number} cannot move from {from} to {to}")]
    InvalidTransition {
        day_number: u32,
        from: DayStatus,
        to: DayStatus,
    },

    /// Mutation attempted on a completed, failed or archived challenge
    #[error("Challenge {challenge_id} is {status}, expected active")]
    ChallengeNotActive {
        challenge_id: String,
        status: ChallengeStatus,
    },

    /// Compensation requested while the missed-day ledger is empty
    #[error("Challenge {0} has no missed day to compensate")]
    NothingToCompensate(String),

    /// The make-up slot already resolved another missed day
    #[error("Make-up day {makeup_day_id} already compensates day {compensates}")]
    MakeupAlreadyUsed {
        makeup_day_id: String,
        compensates: String,
    },

    /// Only appended make-up slots can compensate a missed day
    #[error("Day {day_number} of challenge {challenge_id} is not a make-up day")]
    NotAMakeupDay {
        challenge_id: String,
        day_number: u32,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Snapshot load/save failed; the last mutation is not durable
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// How a day was addressed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayRef {
    Number(u32),
    Id(String),
}

impl fmt::Display for DayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayRef::Number(n) => write!(f, "#{n}"),
            DayRef::Id(id) => f.write_str(id),
        }
    }
}

/// Persistence errors raised by [`crate::storage::ChallengeStore`] implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Timezone name not present in the IANA database
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A stored or computed challenge violates a structural invariant
    #[error("Challenge {challenge_id} is inconsistent: {message}")]
    BrokenInvariant {
        challenge_id: String,
        message: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StoreError::Locked
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
