use std::{ops::Deref, sync::Arc};

use model::{
    client::{Client, ClientProfile},
    errors::LedgerError,
    tx::Tx,
};
use mongodb::bson::oid::ObjectId;
use storage::client::ClientStore;

#[derive(Clone)]
pub struct Clients {
    store: Arc<ClientStore>,
}

impl Clients {
    pub(crate) fn new(store: Arc<ClientStore>) -> Self {
        Clients { store }
    }

    pub async fn get(&self, tx: &mut Tx, id: ObjectId) -> Result<Client, LedgerError> {
        self.store
            .get(tx, id)
            .await?
            .ok_or(LedgerError::ClientNotFound(id))
    }

    pub async fn create(&self, tx: &mut Tx, profile: ClientProfile) -> Result<Client, LedgerError> {
        if profile.name.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("Client name is empty".to_owned()));
        }
        let mut client = Client::new(String::new());
        client.set_profile(profile);
        self.store.insert(tx, &client).await?;
        Ok(client)
    }

    pub async fn update_profile(
        &self,
        tx: &mut Tx,
        id: ObjectId,
        profile: &ClientProfile,
    ) -> Result<(), LedgerError> {
        if profile.name.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("Client name is empty".to_owned()));
        }
        self.get(tx, id).await?;
        self.store.set_profile(tx, id, profile).await?;
        Ok(())
    }
}

impl Deref for Clients {
    type Target = ClientStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
