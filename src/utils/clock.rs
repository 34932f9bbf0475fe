use jiff::{civil::Date, tz::TimeZone, Timestamp};

use crate::db::nyt::lib_nyt::ConnectionsError;

/// Source of the current instant.  Jobs use [SystemClock], tests pin the
/// time with [FixedClock].
pub trait Clock {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Look up a time zone by its IANA name, e.g. "America/New_York".
pub fn time_zone(name: &str) -> Result<TimeZone, ConnectionsError> {
    TimeZone::get(name).map_err(|source| ConnectionsError::TimeZone {
        name: name.to_string(),
        source,
    })
}

/// The puzzle day is the civil date of `now` in the given time zone.  A new
/// puzzle is published at midnight Eastern, not UTC.
pub fn puzzle_date(now: Timestamp, tz: &TimeZone) -> Date {
    now.to_zoned(tz.clone()).date()
}

/// UTC timestamp with second precision, e.g. "2025-01-12T14:05:09Z"
pub fn format_utc(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%dT%H:%M:%SZ").to_string()
}
