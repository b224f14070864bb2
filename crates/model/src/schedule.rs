use bson::oid::ObjectId;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, interval::Interval};

/// Days in storage order, Sunday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub weekday: Weekday,
    pub is_day_off: bool,
    pub working_hours: Option<Interval>,
    pub break_time: Option<Interval>,
}

impl DaySchedule {
    pub fn day_off(weekday: Weekday) -> DaySchedule {
        DaySchedule {
            weekday,
            is_day_off: true,
            working_hours: None,
            break_time: None,
        }
    }

    pub fn open(
        weekday: Weekday,
        working_hours: Interval,
        break_time: Option<Interval>,
    ) -> Result<DaySchedule, ValidationError> {
        if let Some(break_time) = &break_time {
            check_break(&working_hours, break_time)?;
        }
        Ok(DaySchedule {
            weekday,
            is_day_off: false,
            working_hours: Some(working_hours),
            break_time,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.is_day_off, &self.working_hours, &self.break_time) {
            (true, None, None) => Ok(()),
            (true, _, _) => Err(ValidationError::DayOffWithHours),
            (false, None, _) => Err(ValidationError::MissingWorkingHours),
            (false, Some(working_hours), Some(break_time)) => {
                check_break(working_hours, break_time)
            }
            (false, Some(_), None) => Ok(()),
        }
    }

    /// Working hours of an open day.
    pub fn open_hours(&self) -> Option<Interval> {
        if self.is_day_off {
            None
        } else {
            self.working_hours
        }
    }
}

/// The break must start after opening and end before closing.
pub fn check_break(working_hours: &Interval, break_time: &Interval) -> Result<(), ValidationError> {
    if break_time.start() <= working_hours.start() || break_time.end() >= working_hours.end() {
        return Err(ValidationError::BreakOutsideWorkingHours {
            working_hours: *working_hours,
            break_time: *break_time,
        });
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub business_id: ObjectId,
    pub days: Vec<DaySchedule>,
}

impl WeeklySchedule {
    /// `selections` is indexed Sunday first.
    pub fn build(
        business_id: ObjectId,
        selections: [bool; 7],
        working_hours: Option<Interval>,
        break_time: Option<Interval>,
    ) -> Result<WeeklySchedule, ValidationError> {
        let working_hours = match (working_hours, break_time) {
            (None, Some(_)) => return Err(ValidationError::BreakWithoutWorkingHours),
            (None, None) if selections.iter().any(|open| *open) => {
                return Err(ValidationError::MissingWorkingHours)
            }
            (working_hours, _) => working_hours,
        };

        let days = WEEK
            .iter()
            .zip(selections)
            .map(|(weekday, open)| match (open, working_hours) {
                (true, Some(working_hours)) => DaySchedule::open(*weekday, working_hours, break_time),
                _ => Ok(DaySchedule::day_off(*weekday)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WeeklySchedule { business_id, days })
    }

    /// Rows as loaded from storage; `None` if the business has none.
    pub fn from_days(business_id: ObjectId, mut days: Vec<DaySchedule>) -> Option<WeeklySchedule> {
        if days.is_empty() {
            return None;
        }
        days.sort_by_key(|d| d.weekday.num_days_from_sunday());
        days.dedup_by_key(|d| d.weekday);
        Some(WeeklySchedule { business_id, days })
    }

    /// A weekday without a stored row counts as a day off.
    pub fn day(&self, weekday: Weekday) -> DaySchedule {
        self.days
            .iter()
            .find(|d| d.weekday == weekday)
            .cloned()
            .unwrap_or_else(|| DaySchedule::day_off(weekday))
    }

    pub fn open_days(&self) -> impl Iterator<Item = &DaySchedule> {
        self.days.iter().filter(|d| !d.is_day_off)
    }
}
