//! Wall-clock formatting for the transcript and history listings.
//!
//! Times are shown in UTC.

use std::time::{SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: u64 = 86_400;

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// `HH:MM:SS` of a Unix timestamp.
pub fn time_of_day(secs: u64) -> String {
    let secs = secs % SECS_PER_DAY;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `YYYY-MM-DD HH:MM:SS` of a Unix timestamp.
pub fn date_time(secs: u64) -> String {
    let (year, month, day) = civil_from_days(secs / SECS_PER_DAY);
    format!("{year:04}-{month:02}-{day:02} {}", time_of_day(secs))
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // Shift the epoch to 0000-03-01 so leap days fall at the end of a year
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch() {
        assert_eq!(date_time(0), "1970-01-01 00:00:00");
    }

    #[test]
    fn formats_leap_day() {
        // 2024-02-29 13:45:07 UTC
        assert_eq!(date_time(1_709_214_307), "2024-02-29 13:45:07");
    }

    #[test]
    fn time_of_day_wraps() {
        assert_eq!(time_of_day(86_399), "23:59:59");
        assert_eq!(time_of_day(86_400 + 61), "00:01:01");
    }
}
