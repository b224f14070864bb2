use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use eyre::Result;
use futures_util::TryStreamExt as _;
use log::info;
use model::schedule::DaySchedule;
use mongodb::{options::IndexOptions, ClientSession, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tx_macro::tx;

use crate::session::Db;

const COLLECTION: &str = "weekly_schedules";

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Drops every stored day of the business and writes `days` in its place.
    async fn replace_week(&self, business_id: ObjectId, days: &[DaySchedule]) -> Result<()>;
    async fn get_week(&self, business_id: ObjectId) -> Result<Vec<DaySchedule>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct DayRow {
    business_id: ObjectId,
    #[serde(flatten)]
    day: DaySchedule,
}

pub struct MongoScheduleStore {
    db: Db,
    store: Collection<DayRow>,
}

impl MongoScheduleStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let store = db.collection(COLLECTION);
        let index = IndexModel::builder()
            .keys(doc! { "business_id": 1, "weekday": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        store.create_index(index).await?;
        Ok(MongoScheduleStore {
            db: db.clone(),
            store,
        })
    }

    #[tx]
    async fn replace(
        &self,
        session: &mut ClientSession,
        business_id: ObjectId,
        days: &[DaySchedule],
    ) -> Result<()> {
        let removed = self
            .store
            .delete_many(doc! { "business_id": business_id })
            .session(&mut *session)
            .await?;
        let rows = days.iter().cloned().map(|day| DayRow { business_id, day });
        self.store
            .insert_many(rows)
            .session(&mut *session)
            .await?;
        info!(
            "Replaced weekly schedule of {}: {} rows removed, {} written",
            business_id,
            removed.deleted_count,
            days.len()
        );
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MongoScheduleStore {
    async fn replace_week(&self, business_id: ObjectId, days: &[DaySchedule]) -> Result<()> {
        let mut session = self.db.start_session().await?;
        self.replace(&mut session, business_id, days).await
    }

    async fn get_week(&self, business_id: ObjectId) -> Result<Vec<DaySchedule>> {
        let cursor = self.store.find(doc! { "business_id": business_id }).await?;
        let rows: Vec<DayRow> = cursor.try_collect().await?;
        Ok(rows.into_iter().map(|row| row.day).collect())
    }
}
