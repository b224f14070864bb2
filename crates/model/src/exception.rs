use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, interval::Interval, schedule::check_break};

/// What a date-specific exception does to the weekly pattern.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// The whole date is unavailable.
    Closed,
    /// Replaces the working hours. The weekly break is not carried over.
    Hours {
        working_hours: Interval,
        break_time: Option<Interval>,
    },
    /// Reason only, the weekly pattern stays in force.
    Notice,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExceptionEntry {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub business_id: ObjectId,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    pub reason: Option<String>,
}

impl ExceptionEntry {
    pub fn new(
        business_id: ObjectId,
        date: NaiveDate,
        kind: ExceptionKind,
        reason: Option<String>,
    ) -> Result<ExceptionEntry, ValidationError> {
        if let ExceptionKind::Hours {
            working_hours,
            break_time: Some(break_time),
        } = &kind
        {
            check_break(working_hours, break_time)?;
        }
        Ok(ExceptionEntry {
            id: ObjectId::new(),
            business_id,
            date,
            kind,
            reason,
        })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind, ExceptionKind::Closed)
    }

    pub fn substitute_hours(&self) -> Option<(Interval, Option<Interval>)> {
        match self.kind {
            ExceptionKind::Hours {
                working_hours,
                break_time,
            } => Some((working_hours, break_time)),
            _ => None,
        }
    }
}
