pub mod business;
pub mod exception;
pub mod memory;
pub mod reservation;
pub mod schedule;
pub mod session;

use std::sync::Arc;

use business::{BusinessStore, MongoBusinessStore, MongoServiceStore, ServiceStore};
use eyre::Result;
use exception::{ExceptionStore, MongoExceptionStore};
use log::info;
use memory::MemoryStorage;
use reservation::{MongoReservationStore, ReservationStore};
use schedule::{MongoScheduleStore, ScheduleStore};
use session::Db;

#[derive(Clone)]
pub struct Storage {
    pub businesses: Arc<dyn BusinessStore>,
    pub services: Arc<dyn ServiceStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub exceptions: Arc<dyn ExceptionStore>,
    pub reservations: Arc<dyn ReservationStore>,
}

impl Storage {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let db = Db::new(uri, db_name).await?;
        info!("connected to mongo database {}", db_name);
        let businesses = MongoBusinessStore::new(&db);
        let services = MongoServiceStore::new(&db).await?;
        let schedules = MongoScheduleStore::new(&db).await?;
        let exceptions = MongoExceptionStore::new(&db).await?;
        let reservations = MongoReservationStore::new(&db).await?;

        Ok(Storage {
            businesses: Arc::new(businesses),
            services: Arc::new(services),
            schedules: Arc::new(schedules),
            exceptions: Arc::new(exceptions),
            reservations: Arc::new(reservations),
        })
    }

    pub fn in_memory() -> Self {
        Storage::with_memory(Arc::new(MemoryStorage::default()))
    }

    /// Every store backed by the same `memory`.
    pub fn with_memory(memory: Arc<MemoryStorage>) -> Self {
        Storage {
            businesses: memory.clone(),
            services: memory.clone(),
            schedules: memory.clone(),
            exceptions: memory.clone(),
            reservations: memory,
        }
    }
}
