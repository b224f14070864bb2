use std::sync::Arc;

use bson::oid::ObjectId;
use log::info;
use model::{
    business::{Business, Service},
    day::parse_timezone,
    errors::LedgerError,
};
use storage::business::{BusinessStore, ServiceStore};

#[derive(Clone)]
pub struct Businesses {
    businesses: Arc<dyn BusinessStore>,
    services: Arc<dyn ServiceStore>,
}

impl Businesses {
    pub fn new(businesses: Arc<dyn BusinessStore>, services: Arc<dyn ServiceStore>) -> Self {
        Businesses {
            businesses,
            services,
        }
    }

    pub async fn register(&self, name: &str, timezone: &str) -> Result<Business, LedgerError> {
        let timezone = parse_timezone(timezone)?;
        let business = Business::new(name.to_owned(), timezone);
        self.businesses.insert(&business).await?;
        info!("Registered business {} ({}) in {}", business.id, name, timezone);
        Ok(business)
    }

    pub async fn get(&self, id: ObjectId) -> Result<Business, LedgerError> {
        self.businesses
            .get(id)
            .await?
            .ok_or(LedgerError::BusinessNotFound(id))
    }

    pub async fn set_timezone(&self, id: ObjectId, timezone: &str) -> Result<(), LedgerError> {
        let timezone = parse_timezone(timezone)?;
        if !self.businesses.set_timezone(id, timezone).await? {
            return Err(LedgerError::BusinessNotFound(id));
        }
        Ok(())
    }

    pub async fn add_service(
        &self,
        business_id: ObjectId,
        name: &str,
        duration_min: u32,
    ) -> Result<Service, LedgerError> {
        self.get(business_id).await?;
        let service = Service::new(business_id, name.to_owned(), duration_min)?;
        self.services.insert(&service).await?;
        info!(
            "Added service {} ({}, {} min) to {}",
            service.id, name, duration_min, business_id
        );
        Ok(service)
    }

    pub async fn get_service(&self, id: ObjectId) -> Result<Service, LedgerError> {
        self.services
            .get(id)
            .await?
            .ok_or(LedgerError::ServiceNotFound(id))
    }

    pub async fn services(&self, business_id: ObjectId) -> Result<Vec<Service>, LedgerError> {
        Ok(self.services.by_business(business_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::Tz;
    use model::errors::ValidationError;
    use storage::Storage;

    use super::*;

    fn businesses() -> Businesses {
        let storage = Storage::in_memory();
        Businesses::new(storage.businesses, storage.services)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let businesses = businesses();
        let business = businesses.register("Happy Paws", "Europe/Berlin").await.unwrap();
        assert_eq!(businesses.get(business.id).await.unwrap().timezone, Tz::Europe__Berlin);

        businesses.set_timezone(business.id, "Asia/Tokyo").await.unwrap();
        assert_eq!(businesses.get(business.id).await.unwrap().timezone, Tz::Asia__Tokyo);
    }

    #[tokio::test]
    async fn test_unknown_timezone() {
        let err = businesses().register("Happy Paws", "Nowhere/City").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InvalidTimezone(_))
        ));
    }

    #[tokio::test]
    async fn test_services() {
        let businesses = businesses();
        let business = businesses.register("Happy Paws", "UTC").await.unwrap();
        let grooming = businesses.add_service(business.id, "Grooming", 90).await.unwrap();
        assert_eq!(businesses.get_service(grooming.id).await.unwrap(), grooming);
        assert_eq!(businesses.services(business.id).await.unwrap(), vec![grooming]);

        assert!(businesses
            .add_service(ObjectId::new(), "Walk", 30)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(businesses
            .add_service(business.id, "Forever", 0)
            .await
            .unwrap_err()
            .is_validation());
        assert!(businesses
            .get_service(ObjectId::new())
            .await
            .unwrap_err()
            .is_not_found());
    }
}
