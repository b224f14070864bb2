use bson::oid::ObjectId;
use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    interval::{Interval, TimeOfDay},
    reservation::ReservationStatus,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid time: {0:?}, expected HH:MM")]
    InvalidTimeFormat(String),
    #[error("Invalid date: {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Both start and end of {0} are required")]
    IncompleteInterval(&'static str),
    #[error("Interval start {start} must be before end {end}")]
    EmptyInterval { start: TimeOfDay, end: TimeOfDay },
    #[error("Working hours are required when at least one day is open")]
    MissingWorkingHours,
    #[error("A day off can't carry working hours or a break")]
    DayOffWithHours,
    #[error("Break time requires working hours")]
    BreakWithoutWorkingHours,
    #[error("Break {break_time} must lie strictly inside working hours {working_hours}")]
    BreakOutsideWorkingHours {
        working_hours: Interval,
        break_time: Interval,
    },
    #[error("Slot granularity must be between 1 and 1440 minutes, got {0}")]
    InvalidGranularity(u32),
    #[error("Duration must be between 1 and 1440 minutes, got {0}")]
    InvalidDuration(u32),
    #[error("Unknown timezone: {0:?}")]
    InvalidTimezone(String),
    #[error("Reservation can't move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Business not found: {0}")]
    BusinessNotFound(ObjectId),
    #[error("Service not found: {0}")]
    ServiceNotFound(ObjectId),
    #[error("Weekly schedule not found for business: {0}")]
    ScheduleNotFound(ObjectId),
    #[error("Exception not found: {0}")]
    ExceptionNotFound(ObjectId),
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ObjectId),
    #[error("Slot {start} on {date} is not available")]
    SlotUnavailable { date: NaiveDate, start: TimeOfDay },
    #[error("Common error: {0}")]
    Eyre(#[from] eyre::Error),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::BusinessNotFound(_)
                | LedgerError::ServiceNotFound(_)
                | LedgerError::ScheduleNotFound(_)
                | LedgerError::ExceptionNotFound(_)
                | LedgerError::ReservationNotFound(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }

    pub fn is_slot_unavailable(&self) -> bool {
        matches!(self, LedgerError::SlotUnavailable { .. })
    }
}
