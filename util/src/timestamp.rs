use chrono::{prelude::*, TimeZone};
use std::time::Duration;

/// Get Local timestamp, seconds and nanoseconds since Unix epoch
pub fn get_local_timestamp() -> (i64, u32) {
    let utc: DateTime<Utc> = Utc::now();

    (utc.timestamp(), utc.timestamp_subsec_nanos())
}

/// Function to get the current timestamp as UTC Unix timestamp, seconds since Unix epoch.
///
/// Opinions, watermarks and maintenance timers all work with whole seconds.
pub fn get_timestamp() -> i64 {
    get_local_timestamp().0
}

/// Function for pretty printing a timestamp as a human friendly date and time.
///
/// A zero timestamp means "never" for opinion timestamps and is printed as such.
pub fn pretty_print(seconds: i64) -> String {
    if seconds == 0 {
        return "never".to_string();
    }

    match Utc.timestamp_opt(seconds, 0) {
        chrono::LocalResult::Single(date) => date.to_string(),
        _ => format!("{}s", seconds),
    }
}

/// Convert seconds to a human readable format like "2h 46m 40s"
pub fn seconds_to_human_string(x: u64) -> String {
    humantime::format_duration(Duration::from_secs(x)).to_string()
}
