use bson::oid::ObjectId;
use model::{
    errors::{LedgerError, ValidationError},
    reservation::Reservation,
    schedule::WeeklySchedule,
};
use service::{
    businesses::Businesses,
    conflicts::Conflicts,
    exceptions::Exceptions,
    reservations::{PlaceReservation, Reservations},
    schedule::{Schedules, WeeklyScheduleRequest},
    slots::{check_granularity, SlotResult, Slots, DEFAULT_GRANULARITY_MIN},
};
use storage::Storage;

pub mod service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Step between slot starts when a caller doesn't pick one.
    pub slot_granularity_min: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            slot_granularity_min: DEFAULT_GRANULARITY_MIN,
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    pub businesses: Businesses,
    pub schedules: Schedules,
    pub exceptions: Exceptions,
    pub conflicts: Conflicts,
    pub slots: Slots,
    pub reservations: Reservations,
}

impl Ledger {
    pub fn new(storage: Storage, config: LedgerConfig) -> Result<Self, ValidationError> {
        check_granularity(config.slot_granularity_min)?;
        let businesses = Businesses::new(storage.businesses, storage.services);
        let schedules = Schedules::new(storage.schedules, businesses.clone());
        let exceptions = Exceptions::new(storage.exceptions, businesses.clone());
        let conflicts = Conflicts::new(storage.reservations.clone());
        let slots = Slots::new(
            businesses.clone(),
            schedules.clone(),
            exceptions.clone(),
            conflicts.clone(),
            config.slot_granularity_min,
        );
        let reservations = Reservations::new(storage.reservations, businesses.clone(), slots.clone());
        Ok(Ledger {
            businesses,
            schedules,
            exceptions,
            conflicts,
            slots,
            reservations,
        })
    }

    pub async fn set_schedule(
        &self,
        business_id: ObjectId,
        request: &WeeklyScheduleRequest,
    ) -> Result<WeeklySchedule, LedgerError> {
        self.schedules
            .set_weekly_schedule_from_strings(business_id, request)
            .await
    }

    pub async fn get_schedule(&self, business_id: ObjectId) -> Result<WeeklySchedule, LedgerError> {
        self.schedules.get_weekly_schedule(business_id).await
    }

    pub async fn get_slots(
        &self,
        business_id: ObjectId,
        date: &str,
        granularity_min: Option<u32>,
    ) -> Result<SlotResult, LedgerError> {
        self.slots
            .available_slots_str(business_id, date, granularity_min)
            .await
    }

    pub async fn place_reservation(
        &self,
        request: PlaceReservation,
    ) -> Result<Reservation, LedgerError> {
        self.reservations.place_reservation(request).await
    }
}
