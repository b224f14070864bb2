use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use eyre::Result;
use model::{
    business::{Business, Service},
    exception::ExceptionEntry,
    reservation::{Reservation, ReservationStatus},
    schedule::DaySchedule,
};
use parking_lot::Mutex;

use crate::{
    business::{BusinessStore, ServiceStore},
    exception::ExceptionStore,
    reservation::ReservationStore,
    schedule::ScheduleStore,
};

/// Process-local store with the same contracts as the MongoDB one.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    reservation_queries: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    businesses: Vec<Business>,
    services: Vec<Service>,
    days: Vec<(ObjectId, DaySchedule)>,
    exceptions: Vec<ExceptionEntry>,
    reservations: Vec<Reservation>,
}

impl MemoryStorage {
    /// Number of `find_blocking` calls served so far.
    pub fn reservation_queries(&self) -> usize {
        self.reservation_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusinessStore for MemoryStorage {
    async fn insert(&self, business: &Business) -> Result<()> {
        self.inner.lock().businesses.push(business.clone());
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Business>> {
        let inner = self.inner.lock();
        Ok(inner.businesses.iter().find(|b| b.id == id).cloned())
    }

    async fn set_timezone(&self, id: ObjectId, timezone: Tz) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner.businesses.iter_mut().find(|b| b.id == id) {
            Some(business) => {
                business.timezone = timezone;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ServiceStore for MemoryStorage {
    async fn insert(&self, service: &Service) -> Result<()> {
        self.inner.lock().services.push(service.clone());
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Service>> {
        let inner = self.inner.lock();
        Ok(inner.services.iter().find(|s| s.id == id).cloned())
    }

    async fn by_business(&self, business_id: ObjectId) -> Result<Vec<Service>> {
        let inner = self.inner.lock();
        Ok(inner
            .services
            .iter()
            .filter(|s| s.business_id == business_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStorage {
    async fn replace_week(&self, business_id: ObjectId, days: &[DaySchedule]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.days.retain(|(id, _)| *id != business_id);
        inner
            .days
            .extend(days.iter().cloned().map(|day| (business_id, day)));
        Ok(())
    }

    async fn get_week(&self, business_id: ObjectId) -> Result<Vec<DaySchedule>> {
        let inner = self.inner.lock();
        Ok(inner
            .days
            .iter()
            .filter(|(id, _)| *id == business_id)
            .map(|(_, day)| day.clone())
            .collect())
    }
}

#[async_trait]
impl ExceptionStore for MemoryStorage {
    async fn upsert(&self, entry: &ExceptionEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        inner
            .exceptions
            .retain(|e| !(e.business_id == entry.business_id && e.date == entry.date));
        inner.exceptions.push(entry.clone());
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<ExceptionEntry>> {
        let inner = self.inner.lock();
        Ok(inner.exceptions.iter().find(|e| e.id == id).cloned())
    }

    async fn get_by_date(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
    ) -> Result<Option<ExceptionEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .exceptions
            .iter()
            .find(|e| e.business_id == business_id && e.date == date)
            .cloned())
    }

    async fn find_range(
        &self,
        business_id: ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExceptionEntry>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .exceptions
            .iter()
            .filter(|e| e.business_id == business_id && from <= e.date && e.date <= to)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.date);
        Ok(found)
    }

    async fn remove(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock();
        let before = inner.exceptions.len();
        inner.exceptions.retain(|e| e.id != id);
        Ok(inner.exceptions.len() != before)
    }
}

#[async_trait]
impl ReservationStore for MemoryStorage {
    async fn try_insert(&self, reservation: &Reservation) -> Result<bool> {
        let mut inner = self.inner.lock();
        let taken = reservation.blocking
            && inner.reservations.iter().any(|r| {
                r.blocking
                    && r.business_id == reservation.business_id
                    && r.start_at == reservation.start_at
            });
        if taken {
            return Ok(false);
        }
        inner.reservations.push(reservation.clone());
        Ok(true)
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Reservation>> {
        let inner = self.inner.lock();
        Ok(inner.reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn find_blocking(
        &self,
        business_id: ObjectId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        self.reservation_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .reservations
            .iter()
            .filter(|r| {
                r.blocking && r.business_id == business_id && from <= r.start_at && r.start_at < to
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_at);
        Ok(found)
    }

    async fn update_status(
        &self,
        id: ObjectId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner
            .reservations
            .iter_mut()
            .find(|r| r.id == id && r.status == from)
        {
            Some(reservation) => {
                reservation.status = to;
                reservation.blocking = to.is_blocking();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
