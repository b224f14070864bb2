use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::NaiveDate;
use log::info;
use model::{
    errors::LedgerError,
    exception::{ExceptionEntry, ExceptionKind},
    interval::Interval,
    schedule::DaySchedule,
};
use storage::exception::ExceptionStore;

use super::businesses::Businesses;

/// Hours that actually apply on a date once an exception is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveDay {
    Closed,
    Open {
        working_hours: Interval,
        break_time: Option<Interval>,
    },
}

/// `Closed` wins over everything, `Hours` replaces the weekly hours and break
/// together, `Notice` changes nothing.
pub fn effective_day(day: &DaySchedule, exception: Option<&ExceptionEntry>) -> EffectiveDay {
    match exception.map(|e| &e.kind) {
        Some(ExceptionKind::Closed) => EffectiveDay::Closed,
        Some(ExceptionKind::Hours {
            working_hours,
            break_time,
        }) => EffectiveDay::Open {
            working_hours: *working_hours,
            break_time: *break_time,
        },
        Some(ExceptionKind::Notice) | None => match day.open_hours() {
            Some(working_hours) => EffectiveDay::Open {
                working_hours,
                break_time: day.break_time,
            },
            None => EffectiveDay::Closed,
        },
    }
}

#[derive(Clone)]
pub struct Exceptions {
    store: Arc<dyn ExceptionStore>,
    businesses: Businesses,
}

impl Exceptions {
    pub fn new(store: Arc<dyn ExceptionStore>, businesses: Businesses) -> Self {
        Exceptions { store, businesses }
    }

    pub async fn resolve_for_date(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
    ) -> Result<Option<ExceptionEntry>, LedgerError> {
        Ok(self.store.get_by_date(business_id, date).await?)
    }

    /// Replaces whatever exception the date already had.
    pub async fn set_exception(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
        kind: ExceptionKind,
        reason: Option<String>,
    ) -> Result<ExceptionEntry, LedgerError> {
        let mut entry = ExceptionEntry::new(business_id, date, kind, reason)?;
        self.businesses.get(business_id).await?;
        if let Some(existing) = self.store.get_by_date(business_id, date).await? {
            entry.id = existing.id;
        }
        self.store.upsert(&entry).await?;
        info!(
            "Exception {} for {} on {}: {:?}",
            entry.id, business_id, date, entry.kind
        );
        Ok(entry)
    }

    pub async fn remove_exception(&self, id: ObjectId) -> Result<ExceptionEntry, LedgerError> {
        let entry = self
            .store
            .get(id)
            .await?
            .ok_or(LedgerError::ExceptionNotFound(id))?;
        if !self.store.remove(id).await? {
            return Err(LedgerError::ExceptionNotFound(id));
        }
        info!("Exception {} removed ({} on {})", id, entry.business_id, entry.date);
        Ok(entry)
    }

    pub async fn list_exceptions(
        &self,
        business_id: ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExceptionEntry>, LedgerError> {
        Ok(self.store.find_range(business_id, from, to).await?)
    }
}
