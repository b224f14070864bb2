use std::sync::Arc;

use bson::oid::ObjectId;
use log::info;
use model::{
    errors::{LedgerError, ValidationError},
    interval::Interval,
    schedule::WeeklySchedule,
};
use serde::{Deserialize, Serialize};
use storage::schedule::ScheduleStore;

use super::businesses::Businesses;

/// Weekly schedule as submitted by a business: day flags (Sunday first) and
/// `HH:MM` strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyScheduleRequest {
    pub days: [bool; 7],
    pub start: Option<String>,
    pub end: Option<String>,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
}

impl WeeklyScheduleRequest {
    pub fn working_hours(&self) -> Result<Option<Interval>, ValidationError> {
        parse_optional("working hours", &self.start, &self.end)
    }

    pub fn break_time(&self) -> Result<Option<Interval>, ValidationError> {
        parse_optional("break time", &self.break_start, &self.break_end)
    }
}

fn parse_optional(
    name: &'static str,
    start: &Option<String>,
    end: &Option<String>,
) -> Result<Option<Interval>, ValidationError> {
    match (start.as_deref(), end.as_deref()) {
        (Some(start), Some(end)) => Interval::parse(start, end).map(Some),
        (None, None) => Ok(None),
        _ => Err(ValidationError::IncompleteInterval(name)),
    }
}

#[derive(Clone)]
pub struct Schedules {
    store: Arc<dyn ScheduleStore>,
    businesses: Businesses,
}

impl Schedules {
    pub fn new(store: Arc<dyn ScheduleStore>, businesses: Businesses) -> Self {
        Schedules { store, businesses }
    }

    pub async fn set_weekly_schedule(
        &self,
        business_id: ObjectId,
        selections: [bool; 7],
        working_hours: Option<Interval>,
        break_time: Option<Interval>,
    ) -> Result<WeeklySchedule, LedgerError> {
        let week = WeeklySchedule::build(business_id, selections, working_hours, break_time)?;
        self.businesses.get(business_id).await?;
        self.store.replace_week(business_id, &week.days).await?;
        info!(
            "Weekly schedule of {} set: {} open days, hours {:?}, break {:?}",
            business_id,
            week.open_days().count(),
            working_hours,
            break_time
        );
        Ok(week)
    }

    pub async fn set_weekly_schedule_from_strings(
        &self,
        business_id: ObjectId,
        request: &WeeklyScheduleRequest,
    ) -> Result<WeeklySchedule, LedgerError> {
        let working_hours = request.working_hours()?;
        let break_time = request.break_time()?;
        self.set_weekly_schedule(business_id, request.days, working_hours, break_time)
            .await
    }

    pub async fn get_weekly_schedule(
        &self,
        business_id: ObjectId,
    ) -> Result<WeeklySchedule, LedgerError> {
        let days = self.store.get_week(business_id).await?;
        WeeklySchedule::from_days(business_id, days)
            .ok_or(LedgerError::ScheduleNotFound(business_id))
    }
}
