use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono_tz::Tz;
use eyre::Result;
use futures_util::TryStreamExt as _;
use log::info;
use model::business::{Business, Service};
use mongodb::{Collection, Database, IndexModel};

const BUSINESSES: &str = "businesses";
const SERVICES: &str = "services";

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn insert(&self, business: &Business) -> Result<()>;
    async fn get(&self, id: ObjectId) -> Result<Option<Business>>;
    /// `false` if no such business.
    async fn set_timezone(&self, id: ObjectId, timezone: Tz) -> Result<bool>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn insert(&self, service: &Service) -> Result<()>;
    async fn get(&self, id: ObjectId) -> Result<Option<Service>>;
    async fn by_business(&self, business_id: ObjectId) -> Result<Vec<Service>>;
}

pub struct MongoBusinessStore {
    store: Collection<Business>,
}

impl MongoBusinessStore {
    pub(crate) fn new(db: &Database) -> Self {
        MongoBusinessStore {
            store: db.collection(BUSINESSES),
        }
    }
}

#[async_trait]
impl BusinessStore for MongoBusinessStore {
    async fn insert(&self, business: &Business) -> Result<()> {
        info!("Insert business: {} {}", business.id, business.name);
        self.store.insert_one(business).await?;
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Business>> {
        Ok(self.store.find_one(doc! { "_id": id }).await?)
    }

    async fn set_timezone(&self, id: ObjectId, timezone: Tz) -> Result<bool> {
        info!("Set timezone: {} {}", id, timezone);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "timezone": timezone.name() } },
            )
            .await?;
        Ok(result.matched_count == 1)
    }
}

pub struct MongoServiceStore {
    store: Collection<Service>,
}

impl MongoServiceStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store = db.collection(SERVICES);
        store
            .create_index(IndexModel::builder().keys(doc! { "business_id": 1 }).build())
            .await?;
        Ok(MongoServiceStore { store })
    }
}

#[async_trait]
impl ServiceStore for MongoServiceStore {
    async fn insert(&self, service: &Service) -> Result<()> {
        info!("Insert service: {} {}", service.id, service.name);
        self.store.insert_one(service).await?;
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Service>> {
        Ok(self.store.find_one(doc! { "_id": id }).await?)
    }

    async fn by_business(&self, business_id: ObjectId) -> Result<Vec<Service>> {
        let cursor = self.store.find(doc! { "business_id": business_id }).await?;
        Ok(cursor.try_collect().await?)
    }
}
