//! Fixed daily wall-clock schedule in UTC.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use thiserror::Error;

/// Errors raised when parsing a `HH:MM` schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleParseError {
    #[error("schedule must be formatted as HH:MM (got {value:?})")]
    Format { value: String },
}

/// Runs once per day at a fixed UTC time.
///
/// # Examples
/// ```
/// use banner_service::domain::DailySchedule;
/// use chrono::{TimeZone, Utc};
///
/// let schedule: DailySchedule = "03:30".parse().expect("valid schedule");
/// let now = Utc.with_ymd_and_hms(2024, 4, 10, 4, 0, 0).single().expect("timestamp");
/// let next = schedule.next_after(now);
/// assert_eq!(next, Utc.with_ymd_and_hms(2024, 4, 11, 3, 30, 0).single().expect("timestamp"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Run once a day at `at`, interpreted as UTC.
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            return today;
        }
        match now.date_naive().checked_add_days(Days::new(1)) {
            Some(tomorrow) => tomorrow.and_time(self.at).and_utc(),
            None => today,
        }
    }

    /// Time left until the next scheduled instant.
    pub fn delay_after(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            at: NaiveTime::from_hms_opt(3, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl FromStr for DailySchedule {
    type Err = ScheduleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| ScheduleParseError::Format {
                value: value.to_owned(),
            })
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} UTC", self.at.format("%H:%M"))
    }
}
