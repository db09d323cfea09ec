use chrono::{NaiveDateTime, Timelike};
use std::time::Duration;

const HALF_HOUR_SECS: u64 = 30 * 60;
const HOUR_SECS: u64 = 60 * 60;

/// Time until the next refresh: the next half hour normally, the next full
/// hour while the room is dark.
pub fn until_next_refresh(now: NaiveDateTime, dark: bool) -> Duration {
    let minute = u64::from(now.minute());
    let secs = if dark {
        HOUR_SECS - minute * 60
    } else {
        HALF_HOUR_SECS - (minute % 30) * 60
    };
    Duration::from_secs(secs)
}

/// Half hours elapsed in the current hour, drawn as progress markers.
pub fn half_hours_elapsed(now: NaiveDateTime) -> u32 {
    now.minute() / 30
}
