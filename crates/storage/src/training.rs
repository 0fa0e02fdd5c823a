use bson::doc;
use eyre::{eyre, Error};
use futures_util::TryStreamExt as _;
use log::info;
use model::{training::Training, tx::Tx};
use mongodb::{bson::oid::ObjectId, Collection, Database};

use crate::dump;

const COLLECTION: &str = "trainings";

pub struct TrainingStore {
    pub(crate) store: Collection<Training>,
}

impl TrainingStore {
    pub(crate) fn new(db: &Database) -> Self {
        TrainingStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get(&self, tx: &mut Tx, id: ObjectId) -> Result<Option<Training>, Error> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?)
    }

    pub async fn get_all(&self, tx: &mut Tx) -> Result<Vec<Training>, Error> {
        let mut cursor = self
            .store
            .find(doc! {})
            .sort(doc! { "runs_from": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn insert(&self, tx: &mut Tx, training: &Training) -> Result<(), Error> {
        info!("Insert training: {:?}", training);
        self.store.insert_one(training).session(&mut *tx).await?;
        Ok(())
    }

    pub async fn update(&self, tx: &mut Tx, training: &Training) -> Result<(), Error> {
        info!("Update training: {:?}", training);
        let result = self
            .store
            .replace_one(doc! { "_id": training.id }, training)
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Training not found: {}", training.id));
        }
        Ok(())
    }

    pub async fn delete(&self, tx: &mut Tx, id: ObjectId) -> Result<(), Error> {
        info!("Delete training: {}", id);
        let result = self
            .store
            .delete_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?;
        if result.deleted_count != 1 {
            return Err(eyre!("Training not found: {}", id));
        }
        Ok(())
    }
}

impl dump::Collection<Training> for TrainingStore {
    fn collection(&self) -> &Collection<Training> {
        &self.store
    }
}
