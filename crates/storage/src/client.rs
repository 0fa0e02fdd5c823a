use bson::{doc, to_bson};
use eyre::{eyre, Error};
use futures_util::TryStreamExt as _;
use log::info;
use model::{
    client::{Client, ClientProfile},
    subscription::Subscription,
    tx::Tx,
};
use mongodb::{bson::oid::ObjectId, Collection, Database};

use crate::dump;

const COLLECTION: &str = "clients";

pub struct ClientStore {
    pub(crate) store: Collection<Client>,
}

impl ClientStore {
    pub(crate) fn new(db: &Database) -> Self {
        ClientStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get(&self, tx: &mut Tx, id: ObjectId) -> Result<Option<Client>, Error> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *tx)
            .await?)
    }

    pub async fn get_many(&self, tx: &mut Tx, ids: &[ObjectId]) -> Result<Vec<Client>, Error> {
        let mut cursor = self
            .store
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn get_all(&self, tx: &mut Tx) -> Result<Vec<Client>, Error> {
        let mut cursor = self
            .store
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .session(&mut *tx)
            .await?;
        Ok(cursor.stream(&mut *tx).try_collect().await?)
    }

    pub async fn insert(&self, tx: &mut Tx, client: &Client) -> Result<(), Error> {
        info!("Insert client: {:?}", client);
        self.store.insert_one(client).session(&mut *tx).await?;
        Ok(())
    }

    pub async fn set_profile(
        &self,
        tx: &mut Tx,
        id: ObjectId,
        profile: &ClientProfile,
    ) -> Result<(), Error> {
        info!("Set profile: {} {:?}", id, profile);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": profile.name.clone(),
                    "email": to_bson(&profile.email)?,
                    "birthday": to_bson(&profile.birthday)?,
                    "phone": to_bson(&profile.phone)?,
                    "address": to_bson(&profile.address)?,
                } },
            )
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Client not found: {}", id));
        }
        Ok(())
    }

    /// Overwrites the cached active subscriptions of a client.
    pub async fn set_active_subscriptions(
        &self,
        tx: &mut Tx,
        id: ObjectId,
        subscriptions: &[Subscription],
    ) -> Result<(), Error> {
        info!("Set active subscriptions: {} ({})", id, subscriptions.len());
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "active_subscriptions": to_bson(subscriptions)? } },
            )
            .session(&mut *tx)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Client not found: {}", id));
        }
        Ok(())
    }
}

impl dump::Collection<Client> for ClientStore {
    fn collection(&self) -> &Collection<Client> {
        &self.store
    }
}
