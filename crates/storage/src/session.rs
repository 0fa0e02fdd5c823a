use bson::{doc, Document};
use chrono::NaiveDate;
use eyre::{eyre, Error};
use futures_util::TryStreamExt as _;
use log::{debug, info};
use model::{ids::WeekId, session::Session, tx::Tx};
use mongodb::{bson::oid::ObjectId, Collection, Database, IndexModel};

use crate::{db::is_duplicate_key, dump};

const COLLECTION: &str = "sessions";

pub struct SessionStore {
    pub(crate) store: Collection<Session>,
}

impl SessionStore {
    pub(crate) fn new(db: &Database) -> Self {
        SessionStore {
            store: db.collection(COLLECTION),
        }
    }

    pub(crate) async fn create_indexes(&self) -> Result<(), Error> {
        self.store
            .create_index(IndexModel::builder().keys(doc! { "training_id": 1 }).build())
            .await?;
        self.store
            .create_index(IndexModel::builder().keys(doc! { "date": 1 }).build())
            .await?;
        Ok(())
    }

    pub async fn get(&self, tx: &mut Tx, id: &str) -> Result<Option<Session>, Error> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?)
    }

    pub async fn find_week(&self, tx: &mut Tx, week: WeekId) -> Result<Vec<Session>, Error> {
        let mut cursor = self
            .store
            .find(week_filter(week))
            .sort(doc! { "date": 1, "time.start": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    /// Unconfirmed sessions of a training, optionally from a date on.
    pub async fn find_open(
        &self,
        tx: &mut Tx,
        training_id: ObjectId,
        from: Option<NaiveDate>,
    ) -> Result<Vec<Session>, Error> {
        let mut cursor = self
            .store
            .find(open_filter(training_id, from))
            .sort(doc! { "date": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn insert(&self, tx: &mut Tx, session: &Session) -> Result<(), Error> {
        info!("Insert session: {:?}", session);
        self.store.insert_one(session).session(&mut *tx).await?;
        Ok(())
    }

    pub async fn insert_many(&self, tx: &mut Tx, sessions: &[Session]) -> Result<(), Error> {
        if sessions.is_empty() {
            return Ok(());
        }
        info!("Insert {} sessions", sessions.len());
        self.store.insert_many(sessions).session(&mut *tx).await?;
        Ok(())
    }

    /// Inserts the session unless a document with its id exists.
    /// Returns `false` when it was already there.
    pub async fn create_if_absent(&self, tx: &mut Tx, session: &Session) -> Result<bool, Error> {
        match self.store.insert_one(session).session(&mut *tx).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => {
                debug!("Session already exists: {}", session.id);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update(&self, tx: &mut Tx, session: &Session) -> Result<(), Error> {
        info!("Update session: {:?}", session);
        let result = self
            .store
            .replace_one(doc! { "_id": session.id.as_str() }, session)
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Session not found: {}", session.id));
        }
        Ok(())
    }

    pub async fn set_confirmed(
        &self,
        tx: &mut Tx,
        id: &str,
        confirmed: bool,
    ) -> Result<(), Error> {
        info!("Set confirmed: {} {}", id, confirmed);
        let result = self
            .store
            .update_one(doc! { "_id": id }, doc! { "$set": { "confirmed": confirmed } })
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Session not found: {}", id));
        }
        Ok(())
    }

    pub async fn find_by_training(
        &self,
        tx: &mut Tx,
        training_id: ObjectId,
    ) -> Result<Vec<Session>, Error> {
        let mut cursor = self
            .store
            .find(doc! { "training_id": training_id })
            .sort(doc! { "date": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn delete_ids(&self, tx: &mut Tx, ids: &[String]) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .store
            .delete_many(doc! { "_id": { "$in": ids.to_vec() } })
            .session(&mut *tx)
            .await?;
        info!("Deleted {} sessions", result.deleted_count);
        Ok(result.deleted_count)
    }
}

impl dump::Collection<Session> for SessionStore {
    fn collection(&self) -> &Collection<Session> {
        &self.store
    }
}

/// Dates are stored as ISO strings, which order like the dates themselves.
fn date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn week_filter(week: WeekId) -> Document {
    doc! {
        "date": {
            "$gte": date(week.first_day()),
            "$lte": date(week.last_day()),
        }
    }
}

pub(crate) fn open_filter(training_id: ObjectId, from: Option<NaiveDate>) -> Document {
    let mut filter = doc! {
        "training_id": training_id,
        "confirmed": false,
    };
    if let Some(from) = from {
        filter.insert("date", doc! { "$gte": date(from) });
    }
    filter
}
