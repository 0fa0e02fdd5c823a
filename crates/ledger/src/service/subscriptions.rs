use std::{ops::Deref, sync::Arc};

use chrono::NaiveDate;
use log::info;
use model::{
    client::active_subscriptions, errors::LedgerError, subscription::Subscription, tx::Tx,
};
use mongodb::bson::oid::ObjectId;
use storage::{client::ClientStore, subscription::SubscriptionStore};
use tx_macro::tx;

use crate::today;

/// Subscription writes. Each one rebuilds the owner's active subscriptions
/// cache in the same transaction.
#[derive(Clone)]
pub struct Subscriptions {
    store: Arc<SubscriptionStore>,
    clients: Arc<ClientStore>,
}

impl Subscriptions {
    pub(crate) fn new(store: Arc<SubscriptionStore>, clients: Arc<ClientStore>) -> Self {
        Subscriptions { store, clients }
    }

    pub async fn get(&self, tx: &mut Tx, id: ObjectId) -> Result<Subscription, LedgerError> {
        self.store
            .get(tx, id)
            .await?
            .ok_or(LedgerError::SubscriptionNotFound(id))
    }

    #[tx]
    pub async fn create(
        &self,
        tx: &mut Tx,
        subscription: &Subscription,
    ) -> Result<(), LedgerError> {
        if self.clients.get(tx, subscription.client_id).await?.is_none() {
            return Err(LedgerError::ClientNotFound(subscription.client_id));
        }
        self.store.insert(tx, subscription).await?;
        self.refresh_active(tx, subscription.client_id).await?;
        Ok(())
    }

    #[tx]
    pub async fn update(
        &self,
        tx: &mut Tx,
        subscription: &Subscription,
    ) -> Result<(), LedgerError> {
        let stored = self.get(tx, subscription.id).await?;
        if stored.client_id != subscription.client_id {
            return Err(LedgerError::InvalidArgument(format!(
                "Subscription {} belongs to client {}",
                stored.id, stored.client_id
            )));
        }
        self.store.update(tx, subscription).await?;
        self.refresh_active(tx, subscription.client_id).await?;
        Ok(())
    }

    #[tx]
    pub async fn mark_paid(
        &self,
        tx: &mut Tx,
        id: ObjectId,
        paid_at: NaiveDate,
    ) -> Result<Subscription, LedgerError> {
        let mut subscription = self.get(tx, id).await?;
        subscription.paid_at = Some(paid_at);
        self.store.update(tx, &subscription).await?;
        self.refresh_active(tx, subscription.client_id).await?;
        Ok(subscription)
    }

    #[tx]
    pub async fn delete(&self, tx: &mut Tx, id: ObjectId) -> Result<(), LedgerError> {
        let subscription = self.get(tx, id).await?;
        self.store.delete(tx, id).await?;
        self.refresh_active(tx, subscription.client_id).await?;
        Ok(())
    }

    /// Rebuilds the cached active subscriptions of a client from the
    /// subscriptions collection.
    pub async fn refresh_active(
        &self,
        tx: &mut Tx,
        client_id: ObjectId,
    ) -> Result<Vec<Subscription>, LedgerError> {
        let subscriptions = self.store.find_by_client(tx, client_id).await?;
        let active = active_subscriptions(&subscriptions, today());
        self.clients
            .set_active_subscriptions(tx, client_id, &active)
            .await?;
        info!(
            "Client {}: {} of {} subscriptions active",
            client_id,
            active.len(),
            subscriptions.len()
        );
        Ok(active)
    }
}

impl Deref for Subscriptions {
    type Target = SubscriptionStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
