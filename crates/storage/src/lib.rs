pub mod client;
pub mod db;
pub mod dump;
pub mod session;
pub mod subscription;
pub mod training;

use std::sync::Arc;

use client::ClientStore;
use db::Db;
use eyre::Result;
use session::SessionStore;
use subscription::SubscriptionStore;
use training::TrainingStore;

const DB_NAME: &str = "studio_db";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub clients: Arc<ClientStore>,
    pub subscriptions: Arc<SubscriptionStore>,
    pub trainings: Arc<TrainingStore>,
    pub sessions: Arc<SessionStore>,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let storage = Storage::open(uri).await?;
        storage.init().await?;
        Ok(storage)
    }

    /// Builds the stores without touching the server.
    pub async fn open(uri: &str) -> Result<Self> {
        let db = Db::open(uri, DB_NAME).await?;
        let clients = Arc::new(ClientStore::new(&db));
        let subscriptions = Arc::new(SubscriptionStore::new(&db));
        let trainings = Arc::new(TrainingStore::new(&db));
        let sessions = Arc::new(SessionStore::new(&db));

        Ok(Storage {
            db,
            clients,
            subscriptions,
            trainings,
            sessions,
        })
    }

    /// Checks the connection and creates the indexes.
    pub async fn init(&self) -> Result<()> {
        self.db.ping().await?;
        self.subscriptions.create_indexes().await?;
        self.sessions.create_indexes().await?;
        Ok(())
    }
}
