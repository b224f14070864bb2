use chrono::{
    DateTime, Datelike as _, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone as _, Timelike as _, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::{errors::ValidationError, interval::TimeOfDay};

/// Strict `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    if s.len() != 10 {
        return Err(ValidationError::InvalidDate(s.to_owned()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(s.to_owned()))
}

pub fn parse_timezone(s: &str) -> Result<Tz, ValidationError> {
    s.parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(s.to_owned()))
}

/// Local calendar day of a business expressed as a UTC range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub tz: Tz,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DayWindow {
    pub fn new(tz: Tz, date: NaiveDate) -> DayWindow {
        let next = date.succ_opt().unwrap_or(date);
        DayWindow {
            date,
            tz,
            from: local_midnight(tz, date),
            to: local_midnight(tz, next),
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn prev(&self) -> DayWindow {
        DayWindow::new(self.tz, self.date.pred_opt().unwrap_or(self.date))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }

    /// Wall-clock time of `at` inside this day, clamped to the day bounds.
    pub fn time_of_day(&self, at: DateTime<Utc>) -> TimeOfDay {
        if at < self.from {
            TimeOfDay::MIDNIGHT
        } else if at >= self.to {
            TimeOfDay::LAST_MINUTE
        } else {
            TimeOfDay::from_naive(at.with_timezone(&self.tz).time())
        }
    }

    /// Like `time_of_day`, but a partial minute counts as a whole one.
    pub fn time_of_day_ceil(&self, at: DateTime<Utc>) -> TimeOfDay {
        let floor = self.time_of_day(at);
        if at <= self.from || at >= self.to {
            return floor;
        }
        let local = at.with_timezone(&self.tz).time();
        if local.second() == 0 && local.nanosecond() == 0 {
            return floor;
        }
        floor.checked_add_minutes(1).unwrap_or(TimeOfDay::LAST_MINUTE)
    }

    /// `None` when the local time falls into a DST gap.
    pub fn at(&self, time: TimeOfDay) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&self.date.and_time(time.to_naive()))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// First instant of `date` in `tz`. A midnight swallowed by a DST gap resolves
/// to the first valid local time after it.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(dt) = resolve(tz, midnight) {
        return dt;
    }
    (1..=16)
        .map(|step| midnight + Duration::minutes(15 * step))
        .find_map(|candidate| resolve(tz, candidate))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

fn resolve(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-04").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        for bad in ["invalid-date", "2024-3-4", "2024-02-30", "", "04.03.2024"] {
            assert_eq!(
                parse_date(bad),
                Err(ValidationError::InvalidDate(bad.to_owned()))
            );
        }
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Moscow").unwrap(), Tz::Europe__Moscow);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_window_in_offset_zone() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let window = DayWindow::new(Tz::Europe__Moscow, date);
        assert_eq!(
            window.from,
            Utc.with_ymd_and_hms(2024, 3, 3, 21, 0, 0).single().unwrap()
        );
        assert_eq!(
            window.to,
            Utc.with_ymd_and_hms(2024, 3, 4, 21, 0, 0).single().unwrap()
        );
        assert_eq!(window.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_window_on_dst_day_is_short() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let window = DayWindow::new(Tz::Europe__Berlin, date);
        assert_eq!(window.to - window.from, Duration::hours(23));
    }

    #[test]
    fn test_midnight_in_gap() {
        // Santiago springs forward at local midnight.
        let date = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        let from = local_midnight(Tz::America__Santiago, date);
        let local = from.with_timezone(&Tz::America__Santiago);
        assert_eq!(local.date_naive(), date);
        assert_eq!(local.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn test_time_of_day_clamps() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let window = DayWindow::new(Tz::UTC, date);
        let before = Utc.with_ymd_and_hms(2024, 3, 3, 23, 0, 0).single().unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 3, 4, 10, 15, 42).single().unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 5, 1, 0, 0).single().unwrap();
        assert_eq!(window.time_of_day(before), TimeOfDay::MIDNIGHT);
        assert_eq!(window.time_of_day(inside), "10:15".parse().unwrap());
        assert_eq!(window.time_of_day(after), TimeOfDay::LAST_MINUTE);
        assert!(window.contains(inside));
        assert!(!window.contains(after));
    }

    #[test]
    fn test_time_of_day_ceil() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let window = DayWindow::new(Tz::UTC, date);
        let exact = Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).single().unwrap();
        let partial = Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 30).single().unwrap();
        let last = Utc.with_ymd_and_hms(2024, 3, 4, 23, 59, 10).single().unwrap();
        assert_eq!(window.time_of_day_ceil(exact), "11:00".parse().unwrap());
        assert_eq!(window.time_of_day(partial), "11:00".parse().unwrap());
        assert_eq!(window.time_of_day_ceil(partial), "11:01".parse().unwrap());
        assert_eq!(window.time_of_day_ceil(last), TimeOfDay::LAST_MINUTE);
        assert_eq!(window.time_of_day_ceil(window.from), TimeOfDay::MIDNIGHT);
    }

    #[test]
    fn test_at_converts_local_to_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let window = DayWindow::new(Tz::Europe__Moscow, date);
        assert_eq!(
            window.at("09:00".parse().unwrap()),
            Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).single()
        );
        let gap_day = DayWindow::new(
            Tz::Europe__Berlin,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(gap_day.at("02:30".parse().unwrap()), None);
    }
}
