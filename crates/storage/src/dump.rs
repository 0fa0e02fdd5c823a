use async_trait::async_trait;
use bson::doc;
use eyre::Error;
use futures_util::TryStreamExt;
use model::tx::Tx;
use serde::{de::DeserializeOwned, Serialize};

/// Full snapshot of a collection for backups.
#[async_trait]
pub trait Backup<Item> {
    async fn dump(&self, tx: &mut Tx) -> Result<Vec<Item>, Error>;
    async fn restore(&self, items: Vec<Item>, tx: &mut Tx) -> Result<(), Error>;
}

pub trait Collection<Item>
where
    Item: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn collection(&self) -> &mongodb::Collection<Item>;
}

#[async_trait]
impl<Item, C> Backup<Item> for C
where
    Item: Serialize + DeserializeOwned + Unpin + Send + Sync + 'static,
    C: Collection<Item> + Send + Sync,
{
    async fn dump(&self, tx: &mut Tx) -> Result<Vec<Item>, Error> {
        let mut cursor = self.collection().find(doc! {}).session(&mut *tx).await?;
        let items = cursor.stream(&mut *tx).try_collect().await?;
        Ok(items)
    }

    async fn restore(&self, items: Vec<Item>, tx: &mut Tx) -> Result<(), Error> {
        let collection = self.collection();
        collection.delete_many(doc! {}).session(&mut *tx).await?;
        if !items.is_empty() {
            collection.insert_many(items).session(&mut *tx).await?;
        }
        Ok(())
    }
}
