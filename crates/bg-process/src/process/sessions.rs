use async_trait::async_trait;
use eyre::Error;
use ledger::{today, Ledger};
use model::ids::WeekId;

use crate::Task;

/// Keeps the sessions of the current and the next week-year materialized.
#[derive(Clone)]
pub struct SessionsBg {
    ledger: Ledger,
}

impl SessionsBg {
    pub const CRON: &'static str = "0 0 2 * * *";

    pub fn new(ledger: Ledger) -> SessionsBg {
        SessionsBg { ledger }
    }
}

#[async_trait]
impl Task for SessionsBg {
    const NAME: &'static str = "sessions";

    async fn process(&mut self) -> Result<(), Error> {
        let mut tx = self.ledger.db.start_session().await?;
        let year = WeekId::new(today()).year();
        for year in [year, year + 1] {
            self.ledger
                .calendar
                .generate_sessions_for_year(&mut tx, year)
                .await?;
        }
        Ok(())
    }
}
