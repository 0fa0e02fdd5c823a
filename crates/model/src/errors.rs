use bson::oid::ObjectId;
use thiserror::Error;

use crate::{subscription::SubscriptionType, training::TrainingType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Subscription {tp} is not available for {training_type}")]
    InvalidPass {
        tp: SubscriptionType,
        training_type: TrainingType,
    },
    #[error("Subscription {0} requires an end date")]
    MissingEnd(SubscriptionType),
    #[error("Subscription {0} requires trainings left")]
    MissingTrainingsLeft(SubscriptionType),
    #[error("Subscription {tp} has no field {field}")]
    UnexpectedField {
        tp: SubscriptionType,
        field: &'static str,
    },
    #[error("Invalid time: {0}")]
    InvalidTime(String),
    #[error("Invalid time range: {start}-{end}")]
    EmptyTimeRange { start: String, end: String },
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Date out of range: {0}")]
    DateOutOfRange(chrono::NaiveDate),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No matching subscription")]
    NoMatchingSubscription,
    #[error("Expected exactly one subscription with trainings left, found {candidates}")]
    AmbiguousOrExhaustedSubscription { candidates: usize },
    #[error("Several subscriptions with trainings left: {candidates}")]
    AmbiguousSubscription { candidates: usize },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Common error: {0}")]
    Eyre(#[from] eyre::Error),
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Training not found: {0}")]
    TrainingNotFound(ObjectId),
    #[error("Client not found: {0}")]
    ClientNotFound(ObjectId),
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(ObjectId),
    #[error("No valid subscription for client {client_id} in session {session_id}: {source}")]
    NoValidSubscription {
        client_id: ObjectId,
        session_id: String,
        source: SelectionError,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl LedgerError {
    /// True when the failure was a write conflict that survived every retry.
    pub fn is_conflict(&self) -> bool {
        match self {
            LedgerError::MongoError(err) => crate::tx::is_transient(err),
            LedgerError::Eyre(err) => err
                .downcast_ref::<mongodb::error::Error>()
                .map(crate::tx::is_transient)
                .unwrap_or(false),
            _ => false,
        }
    }
}
