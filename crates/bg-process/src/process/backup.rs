use std::path::PathBuf;

use async_trait::async_trait;
use eyre::Error;
use ledger::{today, Ledger};

use crate::Task;

/// Daily zip snapshot into the backup directory.
#[derive(Clone)]
pub struct BackupBg {
    ledger: Ledger,
    dir: PathBuf,
}

impl BackupBg {
    pub fn new(ledger: Ledger, dir: PathBuf) -> BackupBg {
        BackupBg { ledger, dir }
    }
}

#[async_trait]
impl Task for BackupBg {
    const NAME: &'static str = "backup";

    async fn process(&mut self) -> Result<(), Error> {
        let mut tx = self.ledger.db.start_session().await?;
        self.ledger
            .backup
            .export_to(&mut tx, &self.dir, today())
            .await?;
        Ok(())
    }
}
