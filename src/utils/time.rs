use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

/// Signed, fractional minutes from `now` until `target`
pub fn minutes_until<A: TimeZone, B: TimeZone>(target: &DateTime<A>, now: &DateTime<B>) -> f64 {
    let delta = target.naive_utc() - now.naive_utc();
    delta.num_milliseconds() as f64 / 60_000.0
}

/// Format a timestamp in the configured timezone for log output
pub fn format_local<A: TimeZone>(time: &DateTime<A>, tz: &Tz) -> String {
    time.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}
