use std::ops::Deref;

use bson::doc;
use eyre::{Context as _, Error};
use model::tx::Tx;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    Client, Database,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct Db {
    client: Client,
    db: Database,
}

impl Db {
    /// Parses the uri. The driver connects on the first operation.
    pub(crate) async fn open(uri: &str, db_name: &str) -> Result<Self, Error> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let db = client.database(db_name);
        Ok(Db { client, db })
    }

    pub(crate) async fn ping(&self) -> Result<(), Error> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        Ok(())
    }

    pub async fn start_session(&self) -> Result<Tx, Error> {
        let session = self
            .client
            .start_session()
            .await
            .context("Failed to start session")?;
        Ok(Tx::new(session))
    }
}

impl Deref for Db {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}
