use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::ValidationError;

/// Assumed length of a reservation stored without a duration.
pub const DEFAULT_DURATION_MIN: u32 = 60;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
    Rejected,
}

impl ReservationStatus {
    /// Whether a reservation in this status occupies its time.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ReservationStatus::Canceled | ReservationStatus::Rejected)
    }

    pub fn can_move_to(&self, to: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (*self, to),
            (Pending, Confirmed)
                | (Pending, Rejected)
                | (Pending, Canceled)
                | (Confirmed, Completed)
                | (Confirmed, Canceled)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub business_id: ObjectId,
    pub service_id: ObjectId,
    pub pet_id: ObjectId,
    pub user_id: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_min: Option<u32>,
    pub status: ReservationStatus,
    /// Mirrors `status.is_blocking()`, backs the unique start index.
    pub blocking: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn pending(
        business_id: ObjectId,
        service_id: ObjectId,
        pet_id: ObjectId,
        user_id: ObjectId,
        start_at: DateTime<Utc>,
        duration_min: u32,
    ) -> Reservation {
        Reservation {
            id: ObjectId::new(),
            business_id,
            service_id,
            pet_id,
            user_id,
            start_at,
            duration_min: Some(duration_min),
            status: ReservationStatus::Pending,
            blocking: true,
            created_at: Utc::now(),
        }
    }

    pub fn duration_min(&self) -> u32 {
        self.duration_min.unwrap_or(DEFAULT_DURATION_MIN)
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at + Duration::minutes(self.duration_min() as i64)
    }

    pub fn is_blocking(&self) -> bool {
        self.status.is_blocking()
    }

    pub fn set_status(&mut self, to: ReservationStatus) -> Result<(), ValidationError> {
        if !self.status.can_move_to(to) {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.blocking = to.is_blocking();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn reservation(duration_min: Option<u32>) -> Reservation {
        let mut reservation = Reservation::pending(
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).single().unwrap(),
            30,
        );
        reservation.duration_min = duration_min;
        reservation
    }

    #[test]
    fn test_default_duration() {
        let r = reservation(None);
        assert_eq!(
            r.end_at(),
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).single().unwrap()
        );
        let r = reservation(Some(45));
        assert_eq!(
            r.end_at(),
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 45, 0).single().unwrap()
        );
    }

    #[test]
    fn test_transitions() {
        let mut r = reservation(None);
        assert!(r.blocking);
        r.set_status(ReservationStatus::Confirmed).unwrap();
        assert!(r.blocking);
        assert_eq!(
            r.set_status(ReservationStatus::Rejected),
            Err(ValidationError::InvalidTransition {
                from: ReservationStatus::Confirmed,
                to: ReservationStatus::Rejected
            })
        );
        r.set_status(ReservationStatus::Canceled).unwrap();
        assert!(!r.blocking);
        assert!(!r.is_blocking());
        assert!(r.set_status(ReservationStatus::Pending).is_err());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(ReservationStatus::Canceled.to_string(), "CANCELED");
        assert_eq!(
            "confirmed".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Confirmed
        );
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Pending).unwrap(),
            r#""PENDING""#
        );
    }
}
