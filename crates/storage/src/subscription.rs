use bson::doc;
use eyre::{eyre, Error};
use futures_util::TryStreamExt as _;
use log::info;
use model::{subscription::Subscription, training::TrainingType, tx::Tx};
use mongodb::{bson::oid::ObjectId, Collection, Database, IndexModel};

use crate::dump;

const COLLECTION: &str = "subscriptions";

/// Subscriptions of all clients. Every document carries its `client_id`.
pub struct SubscriptionStore {
    pub(crate) store: Collection<Subscription>,
}

impl SubscriptionStore {
    pub(crate) fn new(db: &Database) -> Self {
        SubscriptionStore {
            store: db.collection(COLLECTION),
        }
    }

    pub(crate) async fn create_indexes(&self) -> Result<(), Error> {
        self.store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "client_id": 1, "training_type": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, tx: &mut Tx, id: ObjectId) -> Result<Option<Subscription>, Error> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?)
    }

    pub async fn find_by_client(
        &self,
        tx: &mut Tx,
        client_id: ObjectId,
    ) -> Result<Vec<Subscription>, Error> {
        let mut cursor = self
            .store
            .find(doc! { "client_id": client_id })
            .sort(doc! { "start": -1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn find_for_training(
        &self,
        tx: &mut Tx,
        client_id: ObjectId,
        tp: TrainingType,
    ) -> Result<Vec<Subscription>, Error> {
        let mut cursor = self
            .store
            .find(doc! { "client_id": client_id, "training_type": tp.to_string() })
            .sort(doc! { "_id": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn insert(&self, tx: &mut Tx, subscription: &Subscription) -> Result<(), Error> {
        info!("Insert subscription: {:?}", subscription);
        self.store.insert_one(subscription).session(&mut *tx).await?;
        Ok(())
    }

    pub async fn update(&self, tx: &mut Tx, subscription: &Subscription) -> Result<(), Error> {
        info!("Update subscription: {:?}", subscription);
        let result = self
            .store
            .replace_one(doc! { "_id": subscription.id }, subscription)
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Subscription not found: {}", subscription.id));
        }
        Ok(())
    }

    pub async fn delete(&self, tx: &mut Tx, id: ObjectId) -> Result<(), Error> {
        info!("Delete subscription: {}", id);
        let result = self
            .store
            .delete_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?;
        if result.deleted_count != 1 {
            return Err(eyre!("Subscription not found: {}", id));
        }
        Ok(())
    }

    pub async fn add_trainings(&self, tx: &mut Tx, id: ObjectId, delta: i32) -> Result<(), Error> {
        info!("Add trainings: {} {}", id, delta);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$inc": { "trainings_left": delta } },
            )
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Subscription not found: {}", id));
        }
        Ok(())
    }
}

impl dump::Collection<Subscription> for SubscriptionStore {
    fn collection(&self) -> &Collection<Subscription> {
        &self.store
    }
}
