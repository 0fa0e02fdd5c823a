use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use log::warn;
use mongodb::{
    error::{Error, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    ClientSession,
};

use crate::errors::LedgerError;

pub const MAX_ATTEMPTS: u32 = 5;
const BASE_BACKOFF_MS: u64 = 20;

/// Database session every storage call runs through. Methods annotated with
/// `#[tx]` wrap their body in a transaction on this session.
pub struct Tx {
    client_session: ClientSession,
}

impl Tx {
    pub fn new(client_session: ClientSession) -> Self {
        Tx { client_session }
    }

    /// Commits the running transaction.
    ///
    /// Returns `Ok(false)` when the whole transaction has to be replayed.
    /// A commit with an unknown outcome is retried in place.
    pub async fn commit(&mut self, attempt: u32) -> Result<bool, Error> {
        let mut commit_attempt = 0;
        loop {
            match self.client_session.commit_transaction().await {
                Ok(()) => return Ok(true),
                Err(err)
                    if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && commit_attempt < MAX_ATTEMPTS =>
                {
                    commit_attempt += 1;
                    warn!("Commit result unknown, retrying commit: {}", err);
                }
                Err(err)
                    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) && attempt < MAX_ATTEMPTS =>
                {
                    warn!("Transient commit failure, replaying transaction: {}", err);
                    return Ok(false);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Deref for Tx {
    type Target = ClientSession;

    fn deref(&self) -> &Self::Target {
        &self.client_session
    }
}

impl DerefMut for Tx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client_session
    }
}

impl<'a> From<&'a mut Tx> for &'a mut ClientSession {
    fn from(tx: &'a mut Tx) -> &'a mut ClientSession {
        &mut tx.client_session
    }
}

pub fn is_transient(err: &Error) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
        || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
}

/// Error types a `#[tx]` body may return.
pub trait TxError: From<Error> {
    fn is_transient(&self) -> bool;
}

impl TxError for LedgerError {
    fn is_transient(&self) -> bool {
        self.is_conflict()
    }
}

impl TxError for eyre::Error {
    fn is_transient(&self) -> bool {
        self.downcast_ref::<Error>().map(is_transient).unwrap_or(false)
    }
}

pub async fn backoff(attempt: u32) {
    let delay = BASE_BACKOFF_MS << attempt.min(6);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
