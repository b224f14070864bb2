use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::NaiveDate;
use eyre::Result;
use futures_util::TryStreamExt as _;
use log::info;
use model::exception::ExceptionEntry;
use mongodb::{
    options::{IndexOptions, ReplaceOptions},
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "schedule_exceptions";

#[async_trait]
pub trait ExceptionStore: Send + Sync {
    /// Inserts or replaces the entry of `(business_id, date)`. A replacement
    /// must carry the id of the entry it replaces.
    async fn upsert(&self, entry: &ExceptionEntry) -> Result<()>;
    async fn get(&self, id: ObjectId) -> Result<Option<ExceptionEntry>>;
    async fn get_by_date(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
    ) -> Result<Option<ExceptionEntry>>;
    /// Inclusive on both ends, ordered by date.
    async fn find_range(
        &self,
        business_id: ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExceptionEntry>>;
    /// `false` if nothing was removed.
    async fn remove(&self, id: ObjectId) -> Result<bool>;
}

pub struct MongoExceptionStore {
    store: Collection<ExceptionEntry>,
}

impl MongoExceptionStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store = db.collection(COLLECTION);
        let index = IndexModel::builder()
            .keys(doc! { "business_id": 1, "date": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        store.create_index(index).await?;
        Ok(MongoExceptionStore { store })
    }
}

#[async_trait]
impl ExceptionStore for MongoExceptionStore {
    async fn upsert(&self, entry: &ExceptionEntry) -> Result<()> {
        info!("Upsert exception: {} {} {:?}", entry.business_id, entry.date, entry.kind);
        self.store
            .replace_one(
                doc! { "business_id": entry.business_id, "date": entry.date.to_string() },
                entry,
            )
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }

    async fn get(&self, id: ObjectId) -> Result<Option<ExceptionEntry>> {
        Ok(self.store.find_one(doc! { "_id": id }).await?)
    }

    async fn get_by_date(
        &self,
        business_id: ObjectId,
        date: NaiveDate,
    ) -> Result<Option<ExceptionEntry>> {
        Ok(self
            .store
            .find_one(doc! { "business_id": business_id, "date": date.to_string() })
            .await?)
    }

    async fn find_range(
        &self,
        business_id: ObjectId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExceptionEntry>> {
        let filter = doc! {
            "business_id": business_id,
            "date": { "$gte": from.to_string(), "$lte": to.to_string() },
        };
        let cursor = self.store.find(filter).sort(doc! { "date": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn remove(&self, id: ObjectId) -> Result<bool> {
        info!("Remove exception: {}", id);
        let result = self.store.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count == 1)
    }
}
