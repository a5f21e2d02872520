//! Calendar Features from the Pickup Timestamp

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Reference instant for `pickup_dt`: 2016-01-01 00:00:00, as Unix seconds.
///
/// Fixed so a request's features never depend on other requests.
pub const PICKUP_DT_EPOCH_UNIX: i64 = 1_451_606_400;

/// Temporal features derived from a pickup timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub weekday: u32,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Minute of hour (0-59)
    pub minute: u32,
    /// Seconds since [`PICKUP_DT_EPOCH_UNIX`], negative before it
    pub dt_seconds: f64,
    /// Hour of week, `weekday * 24 + hour` (0-167)
    pub week_hour: u32,
}

impl TemporalFeatures {
    /// Compute features from a wall-clock pickup time
    pub fn from_pickup(pickup: &NaiveDateTime) -> Self {
        let weekday = pickup.weekday().num_days_from_monday();
        let hour = pickup.hour();

        // Both sides are read as UTC so the difference is plain wall-clock
        // seconds with no zone shift.
        let utc = pickup.and_utc();
        let dt_seconds = (utc.timestamp() - PICKUP_DT_EPOCH_UNIX) as f64
            + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;

        Self {
            weekday,
            hour,
            minute: pickup.minute(),
            dt_seconds,
            week_hour: weekday * 24 + hour,
        }
    }
}
