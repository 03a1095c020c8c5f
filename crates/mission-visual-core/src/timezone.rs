//! Civil-day resolution.
//!
//! A challenge day becomes overdue once the owner's local calendar date has
//! moved past the day's scheduled date. That is a civil-date comparison in
//! the owner's timezone, not an elapsed-duration check: 23 hours can cross a
//! boundary while 1 minute may not.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// IANA timezone used to resolve day boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timezone(Tz);

impl Timezone {
    pub const UTC: Timezone = Timezone(Tz::UTC);

    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn tz(&self) -> Tz {
        self.0
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self::UTC
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timezone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Tz>()
            .map(Timezone)
            .map_err(|_| ValidationError::InvalidTimezone(s.to_string()))
    }
}

/// Calendar date of `instant` as observed in `tz`.
pub fn civil_date(instant: DateTime<Utc>, tz: Timezone) -> NaiveDate {
    instant.with_timezone(&tz.0).date_naive()
}

/// True iff `reference` and `now` fall on different civil dates in `tz`.
pub fn has_crossed_midnight(reference: DateTime<Utc>, now: DateTime<Utc>, tz: Timezone) -> bool {
    civil_date(reference, tz) != civil_date(now, tz)
}

/// UTC instant of local midnight on the civil date of `instant`.
///
/// When midnight does not exist locally (a DST jump at 00:00), the earliest
/// valid local time of that date is used.
pub fn day_start_utc(instant: DateTime<Utc>, tz: Timezone) -> DateTime<Utc> {
    let midnight = civil_date(instant, tz).and_time(NaiveTime::MIN);
    (0..=96)
        .map(|quarter| midnight + Duration::minutes(15 * quarter))
        .find_map(|local| tz.0.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(instant)
}
