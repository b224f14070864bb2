use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use eyre::Result;
use futures_util::TryStreamExt as _;
use log::{info, warn};
use model::reservation::{Reservation, ReservationStatus};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "reservations";
const DUPLICATE_KEY: i32 = 11000;

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// `false` when another blocking reservation of the business already
    /// starts at the same instant.
    async fn try_insert(&self, reservation: &Reservation) -> Result<bool>;
    async fn get(&self, id: ObjectId) -> Result<Option<Reservation>>;
    /// Blocking reservations of the business starting in `[from, to)`.
    async fn find_blocking(
        &self,
        business_id: ObjectId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reservation>>;
    /// Compare-and-set on the status; `false` if the reservation is gone or
    /// no longer in `from`.
    async fn update_status(
        &self,
        id: ObjectId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool>;
}

pub struct MongoReservationStore {
    store: Collection<Reservation>,
}

impl MongoReservationStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store = db.collection(COLLECTION);
        let unique_start = IndexModel::builder()
            .keys(doc! { "business_id": 1, "start_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("unique_blocking_start".to_owned())
                    .unique(true)
                    .partial_filter_expression(doc! { "blocking": true })
                    .build(),
            )
            .build();
        store.create_index(unique_start).await?;
        store
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
            .await?;
        Ok(MongoReservationStore { store })
    }
}

#[async_trait]
impl ReservationStore for MongoReservationStore {
    async fn try_insert(&self, reservation: &Reservation) -> Result<bool> {
        match self.store.insert_one(reservation).await {
            Ok(_) => {
                info!("Insert reservation: {} at {}", reservation.id, reservation.start_at);
                Ok(true)
            }
            Err(err) if is_duplicate_key(&err) => {
                warn!(
                    "Reservation start taken: {} at {}",
                    reservation.business_id, reservation.start_at
                );
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: ObjectId) -> Result<Option<Reservation>> {
        Ok(self.store.find_one(doc! { "_id": id }).await?)
    }

    async fn find_blocking(
        &self,
        business_id: ObjectId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let filter = doc! {
            "business_id": business_id,
            "blocking": true,
            "start_at": { "$gte": from, "$lt": to },
        };
        let cursor = self.store.find(filter).sort(doc! { "start_at": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_status(
        &self,
        id: ObjectId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool> {
        info!("Reservation status: {} {} -> {}", id, from, to);
        let result = self
            .store
            .update_one(
                doc! { "_id": id, "status": from.to_string() },
                doc! { "$set": { "status": to.to_string(), "blocking": to.is_blocking() } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}
