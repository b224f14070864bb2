use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::NaiveDate;
use eyre::eyre;
use log::{info, warn};
use model::{
    day::{parse_date, DayWindow},
    errors::LedgerError,
    interval::{Interval, TimeOfDay},
    reservation::{Reservation, ReservationStatus},
};
use serde::{Deserialize, Serialize};
use storage::reservation::ReservationStore;

use super::{businesses::Businesses, slots::Slots};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceReservation {
    pub business_id: ObjectId,
    pub service_id: ObjectId,
    pub pet_id: ObjectId,
    pub user_id: ObjectId,
    /// Business-local calendar date.
    pub date: NaiveDate,
    pub slot_start: TimeOfDay,
}

#[derive(Clone)]
pub struct Reservations {
    store: Arc<dyn ReservationStore>,
    businesses: Businesses,
    slots: Slots,
}

impl Reservations {
    pub fn new(store: Arc<dyn ReservationStore>, businesses: Businesses, slots: Slots) -> Self {
        Reservations {
            store,
            businesses,
            slots,
        }
    }

    pub async fn place_reservation(
        &self,
        request: PlaceReservation,
    ) -> Result<Reservation, LedgerError> {
        let business = self.businesses.get(request.business_id).await?;
        let service = self.businesses.get_service(request.service_id).await?;
        if service.business_id != business.id {
            return Err(LedgerError::ServiceNotFound(service.id));
        }
        let unavailable = || LedgerError::SlotUnavailable {
            date: request.date,
            start: request.slot_start,
        };

        let availability = self
            .slots
            .for_business(&business, request.date, self.slots.granularity_min())
            .await?;
        if !availability.has_slot(request.slot_start) {
            warn!(
                "Rejected reservation for {} on {} at {}: not an available slot",
                business.id, request.date, request.slot_start
            );
            return Err(unavailable());
        }

        let span = Interval::with_duration(request.slot_start, service.duration_min);
        let fits = span
            .map(|span| {
                availability
                    .free_intervals
                    .iter()
                    .any(|free| free.contains_interval(&span))
            })
            .unwrap_or(false);
        if !fits {
            warn!(
                "Rejected reservation for {} on {} at {}: {} min of {} don't fit",
                business.id, request.date, request.slot_start, service.duration_min, service.name
            );
            return Err(unavailable());
        }

        let start_at = DayWindow::new(business.timezone, request.date)
            .at(request.slot_start)
            .ok_or_else(unavailable)?;
        let reservation = Reservation::pending(
            business.id,
            service.id,
            request.pet_id,
            request.user_id,
            start_at,
            service.duration_min,
        );
        if !self.store.try_insert(&reservation).await? {
            warn!(
                "Rejected reservation for {} at {}: start already taken",
                business.id, start_at
            );
            return Err(unavailable());
        }
        info!(
            "Reservation {} placed: business {}, service {}, pet {}, {} {}",
            reservation.id,
            business.id,
            service.id,
            request.pet_id,
            request.date,
            request.slot_start
        );
        Ok(reservation)
    }

    /// `date` as `YYYY-MM-DD`, `slot_start` as `HH:MM`.
    pub async fn place_reservation_str(
        &self,
        business_id: ObjectId,
        service_id: ObjectId,
        pet_id: ObjectId,
        user_id: ObjectId,
        date: &str,
        slot_start: &str,
    ) -> Result<Reservation, LedgerError> {
        let date = parse_date(date)?;
        let slot_start = slot_start.parse::<TimeOfDay>()?;
        self.place_reservation(PlaceReservation {
            business_id,
            service_id,
            pet_id,
            user_id,
            date,
            slot_start,
        })
        .await
    }

    pub async fn get_reservation(&self, id: ObjectId) -> Result<Reservation, LedgerError> {
        self.store
            .get(id)
            .await?
            .ok_or(LedgerError::ReservationNotFound(id))
    }

    pub async fn confirm(&self, id: ObjectId) -> Result<Reservation, LedgerError> {
        self.set_status(id, ReservationStatus::Confirmed).await
    }

    pub async fn reject(&self, id: ObjectId) -> Result<Reservation, LedgerError> {
        self.set_status(id, ReservationStatus::Rejected).await
    }

    pub async fn cancel(&self, id: ObjectId) -> Result<Reservation, LedgerError> {
        self.set_status(id, ReservationStatus::Canceled).await
    }

    pub async fn complete(&self, id: ObjectId) -> Result<Reservation, LedgerError> {
        self.set_status(id, ReservationStatus::Completed).await
    }

    pub async fn set_status(
        &self,
        id: ObjectId,
        status: ReservationStatus,
    ) -> Result<Reservation, LedgerError> {
        let mut reservation = self.get_reservation(id).await?;
        let from = reservation.status;
        reservation.set_status(status)?;
        if !self.store.update_status(id, from, status).await? {
            return Err(eyre!("Reservation {} was modified concurrently", id).into());
        }
        info!("Reservation {}: {} -> {}", id, from, status);
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use chrono_tz::Tz;
    use model::{business::Business, errors::ValidationError, exception::ExceptionKind};
    use storage::Storage;

    use super::*;
    use crate::service::{
        conflicts::Conflicts, exceptions::Exceptions, schedule::Schedules,
        slots::DEFAULT_GRANULARITY_MIN,
    };

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn i(start: &str, end: &str) -> Interval {
        Interval::parse(start, end).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    struct Env {
        businesses: Businesses,
        exceptions: Exceptions,
        reservations: Reservations,
        slots: Slots,
        business: Business,
        grooming: ObjectId,
        bath: ObjectId,
    }

    async fn env(timezone: &str) -> Env {
        let storage = Storage::in_memory();
        let businesses = Businesses::new(storage.businesses.clone(), storage.services.clone());
        let schedules = Schedules::new(storage.schedules.clone(), businesses.clone());
        let exceptions = Exceptions::new(storage.exceptions.clone(), businesses.clone());
        let conflicts = Conflicts::new(storage.reservations.clone());
        let slots = Slots::new(
            businesses.clone(),
            schedules.clone(),
            exceptions.clone(),
            conflicts,
            DEFAULT_GRANULARITY_MIN,
        );
        let reservations =
            Reservations::new(storage.reservations.clone(), businesses.clone(), slots.clone());

        let business = businesses.register("Happy Paws", timezone).await.unwrap();
        schedules
            .set_weekly_schedule(
                business.id,
                [false, true, true, true, true, true, false],
                Some(i("09:00", "18:00")),
                Some(i("12:00", "13:00")),
            )
            .await
            .unwrap();
        let grooming = businesses
            .add_service(business.id, "Grooming", 90)
            .await
            .unwrap()
            .id;
        let bath = businesses
            .add_service(business.id, "Bath", 30)
            .await
            .unwrap()
            .id;
        Env {
            businesses,
            exceptions,
            reservations,
            slots,
            business,
            grooming,
            bath,
        }
    }

    fn request(env: &Env, service_id: ObjectId, slot_start: &str) -> PlaceReservation {
        PlaceReservation {
            business_id: env.business.id,
            service_id,
            pet_id: ObjectId::new(),
            user_id: ObjectId::new(),
            date: monday(),
            slot_start: t(slot_start),
        }
    }

    #[tokio::test]
    async fn test_place_converts_to_utc() {
        let env = env("Europe/Moscow").await;
        let reservation = env
            .reservations
            .place_reservation(request(&env, env.bath, "09:00"))
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert!(reservation.blocking);
        assert_eq!(reservation.duration_min, Some(30));
        assert_eq!(
            reservation.start_at,
            Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).single().unwrap()
        );
        assert_eq!(
            env.reservations.get_reservation(reservation.id).await.unwrap(),
            reservation
        );

        let slots = env
            .slots
            .available_slots(env.business.id, monday(), 30)
            .await
            .unwrap();
        assert!(!slots.has_slot(t("09:00")));
        assert!(slots.has_slot(t("09:30")));
    }

    #[tokio::test]
    async fn test_double_booking_is_rejected() {
        let env = env("UTC").await;
        env.reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap();
        let err = env
            .reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap_err();
        assert!(err.is_slot_unavailable());
    }

    #[tokio::test]
    async fn test_concurrent_placement_has_one_winner() {
        let env = env("UTC").await;
        let (a, b) = tokio::join!(
            env.reservations
                .place_reservation(request(&env, env.grooming, "14:00")),
            env.reservations
                .place_reservation(request(&env, env.grooming, "14:00")),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(LedgerError::is_slot_unavailable));
    }

    #[tokio::test]
    async fn test_service_span_must_fit() {
        let env = env("UTC").await;
        // 11:00 + 90 min runs into the break.
        let err = env
            .reservations
            .place_reservation(request(&env, env.grooming, "11:00"))
            .await
            .unwrap_err();
        assert!(err.is_slot_unavailable());
        // 17:00 + 90 min runs past closing.
        assert!(env
            .reservations
            .place_reservation(request(&env, env.grooming, "17:00"))
            .await
            .unwrap_err()
            .is_slot_unavailable());
        // Overlaps a booking that starts later.
        env.reservations
            .place_reservation(request(&env, env.bath, "15:00"))
            .await
            .unwrap();
        assert!(env
            .reservations
            .place_reservation(request(&env, env.grooming, "14:00"))
            .await
            .unwrap_err()
            .is_slot_unavailable());
        env.reservations
            .place_reservation(request(&env, env.grooming, "10:30"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_off_grid_and_closed_days() {
        let env = env("UTC").await;
        assert!(env
            .reservations
            .place_reservation(request(&env, env.bath, "10:15"))
            .await
            .unwrap_err()
            .is_slot_unavailable());

        env.exceptions
            .set_exception(env.business.id, monday(), ExceptionKind::Closed, None)
            .await
            .unwrap();
        assert!(env
            .reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap_err()
            .is_slot_unavailable());
    }

    #[tokio::test]
    async fn test_service_of_another_business() {
        let env = env("UTC").await;
        let other = env.businesses.register("Other", "UTC").await.unwrap();
        let foreign = env.businesses.add_service(other.id, "Walk", 30).await.unwrap();
        assert!(matches!(
            env.reservations
                .place_reservation(request(&env, foreign.id, "10:00"))
                .await,
            Err(LedgerError::ServiceNotFound(id)) if id == foreign.id
        ));
        assert!(env
            .reservations
            .place_reservation(request(&env, ObjectId::new(), "10:00"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_place_from_strings() {
        let env = env("UTC").await;
        let placed = env
            .reservations
            .place_reservation_str(
                env.business.id,
                env.bath,
                ObjectId::new(),
                ObjectId::new(),
                "2024-03-04",
                "16:30",
            )
            .await
            .unwrap();
        assert_eq!(
            placed.start_at,
            Utc.with_ymd_and_hms(2024, 3, 4, 16, 30, 0).single().unwrap()
        );
        for (date, time) in [("2024-03-32", "10:00"), ("2024-03-04", "10:0")] {
            assert!(env
                .reservations
                .place_reservation_str(
                    env.business.id,
                    env.bath,
                    ObjectId::new(),
                    ObjectId::new(),
                    date,
                    time,
                )
                .await
                .unwrap_err()
                .is_validation());
        }
    }

    #[tokio::test]
    async fn test_dst_gap_slot_is_unavailable() {
        let env = env("Europe/Berlin").await;
        assert_eq!(env.business.timezone, Tz::Europe__Berlin);
        // 2024-03-31 is a Sunday; open it from 01:00 to 04:00.
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        env.exceptions
            .set_exception(
                env.business.id,
                date,
                ExceptionKind::Hours {
                    working_hours: i("01:00", "04:00"),
                    break_time: None,
                },
                None,
            )
            .await
            .unwrap();
        let mut gap = request(&env, env.bath, "02:30");
        gap.date = date;
        assert!(env
            .reservations
            .place_reservation(gap)
            .await
            .unwrap_err()
            .is_slot_unavailable());
        let mut after = request(&env, env.bath, "03:00");
        after.date = date;
        let placed = env.reservations.place_reservation(after).await.unwrap();
        assert_eq!(
            placed.start_at,
            Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).single().unwrap()
        );
    }

    #[tokio::test]
    async fn test_transitions() {
        let env = env("UTC").await;
        let placed = env
            .reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap();
        let confirmed = env.reservations.confirm(placed.id).await.unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert!(matches!(
            env.reservations.reject(placed.id).await,
            Err(LedgerError::Validation(ValidationError::InvalidTransition {
                from: ReservationStatus::Confirmed,
                to: ReservationStatus::Rejected,
            }))
        ));
        let completed = env.reservations.complete(placed.id).await.unwrap();
        assert_eq!(completed.status, ReservationStatus::Completed);
        assert!(completed.blocking);
        assert!(env.reservations.cancel(placed.id).await.unwrap_err().is_validation());
        assert!(matches!(
            env.reservations.confirm(ObjectId::new()).await,
            Err(LedgerError::ReservationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_frees_the_slot() {
        let env = env("UTC").await;
        let placed = env
            .reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap();
        let canceled = env.reservations.cancel(placed.id).await.unwrap();
        assert!(!canceled.blocking);
        env.reservations
            .place_reservation(request(&env, env.bath, "10:00"))
            .await
            .unwrap();
    }
}
