use bson::oid::ObjectId;
use chrono::{Datelike as _, NaiveDate};
use log::debug;
use model::{
    business::Business,
    day::parse_date,
    errors::{LedgerError, ValidationError},
    exception::ExceptionEntry,
    interval::{subtract, Interval, TimeOfDay},
    schedule::DaySchedule,
};
use serde::{Deserialize, Serialize};

use super::{
    businesses::Businesses,
    conflicts::Conflicts,
    exceptions::{effective_day, EffectiveDay, Exceptions},
    schedule::Schedules,
};

pub const DEFAULT_GRANULARITY_MIN: u32 = 30;
const MAX_GRANULARITY_MIN: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotResult {
    pub date: NaiveDate,
    pub is_day_off: bool,
    pub available_time_slots: Vec<TimeOfDay>,
    /// Weekly entry for the weekday of `date`.
    pub weekly_schedule: DaySchedule,
    pub exception_schedule: Option<ExceptionEntry>,
    pub free_intervals: Vec<Interval>,
}

impl SlotResult {
    fn day_off(date: NaiveDate, day: DaySchedule, exception: Option<ExceptionEntry>) -> SlotResult {
        SlotResult {
            date,
            is_day_off: true,
            available_time_slots: Vec::new(),
            weekly_schedule: day,
            exception_schedule: exception,
            free_intervals: Vec::new(),
        }
    }

    pub fn has_slot(&self, start: TimeOfDay) -> bool {
        self.available_time_slots.binary_search(&start).is_ok()
    }
}

pub fn check_granularity(granularity_min: u32) -> Result<(), ValidationError> {
    if granularity_min == 0 || granularity_min > MAX_GRANULARITY_MIN {
        return Err(ValidationError::InvalidGranularity(granularity_min));
    }
    Ok(())
}

/// Starts of the `granularity_min` long slots inside `working_hours` that
/// don't overlap any of `blocked`.
pub fn generate_slots(
    working_hours: Interval,
    blocked: &[Interval],
    granularity_min: u32,
) -> Vec<TimeOfDay> {
    let end = working_hours.end().minutes();
    (working_hours.start().minutes()..)
        .step_by(granularity_min.max(1) as usize)
        .take_while(|start| start + granularity_min <= end)
        .filter_map(|start| {
            Interval::with_duration(TimeOfDay::from_minutes(start)?, granularity_min)
        })
        .filter(|slot| !blocked.iter().any(|b| b.overlaps(slot)))
        .map(|slot| slot.start())
        .collect()
}

#[derive(Clone)]
pub struct Slots {
    businesses: Businesses,
    schedules: Schedules,
    exceptions: Exceptions,
    conflicts: Conflicts,
    granularity_min: u32,
}

impl Slots {
    pub fn new(
        businesses: Businesses,
        schedules: Schedules,
        exceptions: Exceptions,
        conflicts: Conflicts,
        granularity_min: u32,
    ) -> Self {
        Slots {
            businesses,
            schedules,
            exceptions,
            conflicts,
            granularity_min,
        }
    }

    /// Configured default slot step.
    pub fn granularity_min(&self) -> u32 {
        self.granularity_min
    }

    pub async fn available_slots(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
        granularity_min: u32,
    ) -> Result<SlotResult, LedgerError> {
        let business = self.businesses.get(business_id).await?;
        self.for_business(&business, date, granularity_min).await
    }

    /// `date` as `YYYY-MM-DD`; the configured step when `granularity_min` is `None`.
    pub async fn available_slots_str(
        &self,
        business_id: ObjectId,
        date: &str,
        granularity_min: Option<u32>,
    ) -> Result<SlotResult, LedgerError> {
        let date = parse_date(date)?;
        self.available_slots(
            business_id,
            date,
            granularity_min.unwrap_or(self.granularity_min),
        )
        .await
    }

    pub(crate) async fn for_business(
        &self,
        business: &Business,
        date: NaiveDate,
        granularity_min: u32,
    ) -> Result<SlotResult, LedgerError> {
        check_granularity(granularity_min)?;
        let week = self.schedules.get_weekly_schedule(business.id).await?;
        let day = week.day(date.weekday());
        let exception = self.exceptions.resolve_for_date(business.id, date).await?;

        let (working_hours, break_time) = match effective_day(&day, exception.as_ref()) {
            EffectiveDay::Closed => {
                debug!("{} is closed on {}", business.id, date);
                return Ok(SlotResult::day_off(date, day, exception));
            }
            EffectiveDay::Open {
                working_hours,
                break_time,
            } => (working_hours, break_time),
        };

        let mut blocked: Vec<Interval> = break_time.into_iter().collect();
        blocked.extend(self.conflicts.blocked_intervals_for(business, date).await?);

        let available_time_slots = generate_slots(working_hours, &blocked, granularity_min);
        let free_intervals = subtract(working_hours, &blocked);
        debug!(
            "{} on {}: hours {}, {} slots, free {:?}",
            business.id,
            date,
            working_hours,
            available_time_slots.len(),
            free_intervals
        );

        Ok(SlotResult {
            date,
            is_day_off: false,
            available_time_slots,
            weekly_schedule: day,
            exception_schedule: exception,
            free_intervals,
        })
    }
}
