use std::{ops::Deref, sync::Arc};

use log::info;
use model::{
    errors::LedgerError,
    ids::WeekId,
    schedule::{
        plan_bulk_edit, plan_single_edit, removed_with, sessions_for_training, sessions_for_year,
        SessionInput, UpdateMode,
    },
    session::Session,
    training::Training,
    tx::Tx,
};
use mongodb::bson::oid::ObjectId;
use storage::{session::SessionStore, training::TrainingStore};
use tx_macro::tx;

#[derive(Clone)]
pub struct Calendar {
    trainings: Arc<TrainingStore>,
    sessions: Arc<SessionStore>,
}

impl Calendar {
    pub(crate) fn new(trainings: Arc<TrainingStore>, sessions: Arc<SessionStore>) -> Self {
        Calendar {
            trainings,
            sessions,
        }
    }

    pub async fn get_training(&self, tx: &mut Tx, id: ObjectId) -> Result<Training, LedgerError> {
        self.trainings
            .get(tx, id)
            .await?
            .ok_or(LedgerError::TrainingNotFound(id))
    }

    pub async fn get_session(&self, tx: &mut Tx, id: &str) -> Result<Session, LedgerError> {
        self.sessions
            .get(tx, id)
            .await?
            .ok_or_else(|| LedgerError::SessionNotFound(id.to_owned()))
    }

    pub async fn trainings(&self, tx: &mut Tx) -> Result<Vec<Training>, LedgerError> {
        Ok(self.trainings.get_all(tx).await?)
    }

    /// Materializes the sessions of every training for an ISO week-year.
    ///
    /// Runs outside a transaction: each insert is create-if-absent, so an
    /// interrupted run is finished by calling it again.
    pub async fn generate_sessions_for_year(
        &self,
        tx: &mut Tx,
        year: i32,
    ) -> Result<usize, LedgerError> {
        let trainings = self.trainings.get_all(tx).await?;
        let mut created = 0;
        for session in sessions_for_year(&trainings, year) {
            if self.sessions.create_if_absent(tx, &session).await? {
                created += 1;
            }
        }
        info!("Generated {} sessions for {}", created, year);
        Ok(created)
    }

    /// Sessions of a week, generating its year first.
    pub async fn sessions_for_week(
        &self,
        tx: &mut Tx,
        week: WeekId,
    ) -> Result<Vec<Session>, LedgerError> {
        self.generate_sessions_for_year(tx, week.year()).await?;
        Ok(self.sessions.find_week(tx, week).await?)
    }

    /// Stores a new training with its sessions for the rest of its first year.
    #[tx]
    pub async fn create_training(
        &self,
        tx: &mut Tx,
        training: &Training,
    ) -> Result<(), LedgerError> {
        self.trainings.insert(tx, training).await?;
        let sessions = sessions_for_training(training, training.start_week().year());
        self.sessions.insert_many(tx, &sessions).await?;
        Ok(())
    }

    /// Deletes a training and its open sessions from its first day on.
    /// Confirmed sessions stay.
    #[tx]
    pub async fn delete_training(&self, tx: &mut Tx, id: ObjectId) -> Result<u64, LedgerError> {
        let training = self.get_training(tx, id).await?;
        self.trainings.delete(tx, id).await?;
        let sessions = self.sessions.find_by_training(tx, id).await?;
        let removed = removed_with(&training, &sessions);
        Ok(self.sessions.delete_ids(tx, &removed).await?)
    }

    pub async fn create_single_session(
        &self,
        tx: &mut Tx,
        session: &Session,
    ) -> Result<(), LedgerError> {
        if !session.is_single() {
            return Err(LedgerError::InvalidArgument(format!(
                "Session {} belongs to a training",
                session.id
            )));
        }
        self.sessions.insert(tx, session).await?;
        Ok(())
    }

    #[tx]
    pub async fn update_session(
        &self,
        tx: &mut Tx,
        mode: UpdateMode,
        session_id: &str,
        input: &SessionInput,
    ) -> Result<Session, LedgerError> {
        let session = self.get_session(tx, session_id).await?;
        let plan = match mode.scope(&session)? {
            Some(scope) => {
                let training = self.get_training(tx, scope.training_id).await?;
                let siblings = self
                    .sessions
                    .find_open(tx, scope.training_id, scope.from)
                    .await?;
                plan_bulk_edit(mode, &session, training, siblings, input)
            }
            None => plan_single_edit(session, input),
        };

        if let Some(training) = &plan.training {
            self.trainings.update(tx, training).await?;
        }
        for session in &plan.sessions {
            self.sessions.update(tx, session).await?;
        }
        info!(
            "Updated session {} ({}): {} sessions",
            session_id,
            mode,
            plan.sessions.len()
        );
        self.get_session(tx, session_id).await
    }
}

impl Deref for Calendar {
    type Target = SessionStore;

    fn deref(&self) -> &Self::Target {
        &self.sessions
    }
}
