use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

pub const MAX_DURATION_MIN: u32 = 24 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Business {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    /// Local reference for calendar days and wall-clock times.
    pub timezone: Tz,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Business {
    pub fn new(name: String, timezone: Tz) -> Business {
        Business {
            id: ObjectId::new(),
            name,
            timezone,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub business_id: ObjectId,
    pub name: String,
    pub duration_min: u32,
}

impl Service {
    pub fn new(
        business_id: ObjectId,
        name: String,
        duration_min: u32,
    ) -> Result<Service, ValidationError> {
        if duration_min == 0 || duration_min > MAX_DURATION_MIN {
            return Err(ValidationError::InvalidDuration(duration_min));
        }
        Ok(Service {
            id: ObjectId::new(),
            business_id,
            name,
            duration_min,
        })
    }
}
