use std::{
    io::{Cursor, Read, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use eyre::{Context, Error};
use log::{info, warn};
use model::tx::Tx;
use serde::de::DeserializeOwned;
use storage::{
    client::ClientStore, dump::Backup as _, session::SessionStore,
    subscription::SubscriptionStore, training::TrainingStore, Storage,
};
use tx_macro::tx;
use zip::write::SimpleFileOptions;

const CLIENTS: &str = "clients.json";
const SUBSCRIPTIONS: &str = "subscriptions.json";
const TRAININGS: &str = "trainings.json";
const SESSIONS: &str = "sessions.json";

/// Zip snapshot of every collection, one pretty JSON file per collection.
#[derive(Clone)]
pub struct Backup {
    clients: Arc<ClientStore>,
    subscriptions: Arc<SubscriptionStore>,
    trainings: Arc<TrainingStore>,
    sessions: Arc<SessionStore>,
}

impl Backup {
    pub(crate) fn new(storage: &Storage) -> Backup {
        Backup {
            clients: storage.clients.clone(),
            subscriptions: storage.subscriptions.clone(),
            trainings: storage.trainings.clone(),
            sessions: storage.sessions.clone(),
        }
    }

    #[tx]
    pub async fn make_backup(&self, tx: &mut Tx) -> Result<Vec<u8>, Error> {
        info!("Making backup");
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Bzip2)
            .compression_level(Some(9))
            .large_file(true)
            .unix_permissions(0o644);

        zip.start_file(CLIENTS, options)?;
        zip.write_all(&serde_json::to_vec_pretty(
            &self.clients.dump(tx).await.context("clients")?,
        )?)?;

        zip.start_file(SUBSCRIPTIONS, options)?;
        zip.write_all(&serde_json::to_vec_pretty(
            &self
                .subscriptions
                .dump(tx)
                .await
                .context("subscriptions")?,
        )?)?;

        zip.start_file(TRAININGS, options)?;
        zip.write_all(&serde_json::to_vec_pretty(
            &self.trainings.dump(tx).await.context("trainings")?,
        )?)?;

        zip.start_file(SESSIONS, options)?;
        zip.write_all(&serde_json::to_vec_pretty(
            &self.sessions.dump(tx).await.context("sessions")?,
        )?)?;

        let mut writer = zip.finish()?;
        writer.flush()?;
        info!("Backup done: {} kb", writer.get_ref().len() / 1024);
        Ok(writer.into_inner())
    }

    /// Writes a backup to `dir` as `backup-YYYY-MM-DD.zip`.
    pub async fn export_to(
        &self,
        tx: &mut Tx,
        dir: &Path,
        day: NaiveDate,
    ) -> Result<PathBuf, Error> {
        let dump = self.make_backup(tx).await?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(backup_file_name(day));
        tokio::fs::write(&path, dump)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        info!("Backup saved to {}", path.display());
        Ok(path)
    }

    /// Replaces the collections found in the archive. Missing files leave
    /// their collection untouched.
    #[tx]
    pub async fn apply_backup(&self, tx: &mut Tx, dump: &[u8]) -> Result<(), Error> {
        info!("Applying backup");
        let mut zip = zip::ZipArchive::new(Cursor::new(dump))?;

        if let Some(clients) = read_file(&mut zip, CLIENTS)? {
            self.clients.restore(clients, tx).await.context("clients")?;
        }
        if let Some(subscriptions) = read_file(&mut zip, SUBSCRIPTIONS)? {
            self.subscriptions
                .restore(subscriptions, tx)
                .await
                .context("subscriptions")?;
        }
        if let Some(trainings) = read_file(&mut zip, TRAININGS)? {
            self.trainings
                .restore(trainings, tx)
                .await
                .context("trainings")?;
        }
        if let Some(sessions) = read_file(&mut zip, SESSIONS)? {
            self.sessions.restore(sessions, tx).await.context("sessions")?;
        }

        info!("Backup applied");
        Ok(())
    }
}

pub fn backup_file_name(day: NaiveDate) -> String {
    format!("backup-{}.zip", day.format("%Y-%m-%d"))
}

fn read_file<T, R>(zip: &mut zip::ZipArchive<R>, name: &str) -> Result<Option<T>, Error>
where
    T: DeserializeOwned,
    R: Read + std::io::Seek,
{
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            warn!("No {} in backup", name);
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let value = serde_json::from_slice(&buf).context(name.to_owned())?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_file_name() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(backup_file_name(day), "backup-2024-03-05.zip");
    }

    #[test]
    fn test_read_missing_file() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(TRAININGS, SimpleFileOptions::default()).unwrap();
        zip.write_all(b"[]").unwrap();
        let data = zip.finish().unwrap().into_inner();

        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let missing: Option<Vec<serde_json::Value>> = read_file(&mut archive, CLIENTS).unwrap();
        assert!(missing.is_none());
        let empty: Option<Vec<serde_json::Value>> = read_file(&mut archive, TRAININGS).unwrap();
        assert_eq!(empty, Some(vec![]));
    }
}
