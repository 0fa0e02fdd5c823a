use chrono::{Local, NaiveDate};
use log::info;
use model::{
    client::{clients_with_issues, Client},
    confirm::{charged_clients, plan_toggle, ToggleWrite},
    errors::LedgerError,
    session::Session,
    tx::Tx,
};
use service::{
    backup::Backup, calendar::Calendar, clients::Clients, subscriptions::Subscriptions,
};
use storage::{db::Db, Storage};
use tx_macro::tx;

pub mod service;

/// Local calendar day used for every validity check.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Clone)]
pub struct Ledger {
    pub db: Db,
    pub clients: Clients,
    pub subscriptions: Subscriptions,
    pub calendar: Calendar,
    pub backup: Backup,
}

impl Ledger {
    pub fn new(storage: Storage) -> Self {
        let backup = Backup::new(&storage);
        let clients = Clients::new(storage.clients.clone());
        let subscriptions = Subscriptions::new(storage.subscriptions, storage.clients);
        let calendar = Calendar::new(storage.trainings, storage.sessions);
        Ledger {
            db: storage.db,
            clients,
            subscriptions,
            calendar,
            backup,
        }
    }

    /// Confirms an open session or reopens a confirmed one.
    ///
    /// Confirming a counted training takes one training from a pass of every
    /// client; reopening gives it back. If any client has no usable pass the
    /// whole toggle fails and nothing is written.
    #[tx]
    pub async fn toggle_session_confirmed(
        &self,
        tx: &mut Tx,
        session_id: &str,
    ) -> Result<Session, LedgerError> {
        let mut session = self.calendar.get_session(tx, session_id).await?;

        let clients = charged_clients(&session);
        let mut passes = Vec::with_capacity(clients.len());
        for client_id in clients {
            let subscriptions = self
                .subscriptions
                .find_for_training(tx, client_id, session.tp)
                .await?;
            passes.push((client_id, subscriptions));
        }

        let plan = plan_toggle(&session, &passes, today())?;
        plan.apply_to_session(&mut session);
        for write in plan.writes(&session.id) {
            match write {
                ToggleWrite::SetConfirmed {
                    session_id,
                    confirmed,
                } => {
                    self.calendar
                        .set_confirmed(tx, &session_id, confirmed)
                        .await?;
                }
                ToggleWrite::AddTrainings {
                    subscription_id,
                    delta,
                } => {
                    self.subscriptions
                        .add_trainings(tx, subscription_id, delta)
                        .await?;
                }
                ToggleWrite::RefreshActive { client_id } => {
                    self.subscriptions.refresh_active(tx, client_id).await?;
                }
            }
        }

        info!(
            "Session {} {:?}: {} charges",
            session.id,
            plan.action,
            plan.charges.len()
        );
        Ok(session)
    }

    /// Clients of a session whose cached passes do not cover it.
    pub async fn clients_with_issues(
        &self,
        tx: &mut Tx,
        session_id: &str,
    ) -> Result<Vec<Client>, LedgerError> {
        let session = self.calendar.get_session(tx, session_id).await?;
        let clients = self.clients.get_many(tx, &session.client_ids).await?;
        Ok(clients_with_issues(&clients, &session)
            .into_iter()
            .cloned()
            .collect())
    }
}
