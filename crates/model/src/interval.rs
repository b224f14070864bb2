use std::{fmt, ops::Sub, str::FromStr};

use chrono::{NaiveTime, Timelike as _};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::errors::ValidationError;

const MINUTES_IN_DAY: u32 = 24 * 60;

/// Wall-clock time with minute precision, stored as minutes since midnight.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay((MINUTES_IN_DAY - 1) as u16);

    pub fn new(hour: u32, minute: u32) -> Result<TimeOfDay, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTimeFormat(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(TimeOfDay((hour * 60 + minute) as u16))
    }

    pub fn from_minutes(minutes: u32) -> Option<TimeOfDay> {
        if minutes < MINUTES_IN_DAY {
            Some(TimeOfDay(minutes as u16))
        } else {
            None
        }
    }

    /// Drops seconds and below.
    pub fn from_naive(time: NaiveTime) -> TimeOfDay {
        TimeOfDay((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn to_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn hour(&self) -> u32 {
        self.0 as u32 / 60
    }

    pub fn minute(&self) -> u32 {
        self.0 as u32 % 60
    }

    pub fn minutes(&self) -> u32 {
        self.0 as u32
    }

    /// `None` when the result would pass 23:59.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<TimeOfDay> {
        TimeOfDay::from_minutes(self.minutes().checked_add(minutes)?)
    }
}

impl Sub for TimeOfDay {
    type Output = i32;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 as i32 - rhs.0 as i32
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ValidationError::InvalidTimeFormat(s.to_owned());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(err());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(err());
        }
        let hour = ((digits[0] - b'0') * 10 + (digits[1] - b'0')) as u32;
        let minute = ((digits[2] - b'0') * 10 + (digits[3] - b'0')) as u32;
        TimeOfDay::new(hour, minute).map_err(|_| err())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl fmt::Debug for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Half-open `[start, end)` block within a single day.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: TimeOfDay,
    end: TimeOfDay,
}

#[derive(Deserialize)]
struct RawInterval {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<RawInterval> for Interval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Interval, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyInterval { start, end });
        }
        Ok(Interval { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Interval, ValidationError> {
        Interval::new(start.parse()?, end.parse()?)
    }

    /// Interval of `duration_min` minutes from `start`, if it ends by 23:59.
    pub fn with_duration(start: TimeOfDay, duration_min: u32) -> Option<Interval> {
        let end = start.checked_add_minutes(duration_min)?;
        Interval::new(start, end).ok()
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn duration_min(&self) -> u32 {
        (self.end - self.start) as u32
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_interval(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}<->{})", self.start, self.end)
    }
}

/// Maximal sub-intervals of `base` not covered by any of `blocked`, ordered by start.
pub fn subtract(base: Interval, blocked: &[Interval]) -> Vec<Interval> {
    let mut clipped: Vec<(TimeOfDay, TimeOfDay)> = blocked
        .iter()
        .filter(|b| b.overlaps(&base))
        .map(|b| (b.start.max(base.start), b.end.min(base.end)))
        .collect();
    clipped.sort();

    let mut free = Vec::new();
    let mut cursor = base.start;
    for (start, end) in clipped {
        if cursor < start {
            free.push(Interval { start: cursor, end: start });
        }
        cursor = cursor.max(end);
    }
    if cursor < base.end {
        free.push(Interval {
            start: cursor,
            end: base.end,
        });
    }
    free
}
