use async_trait::async_trait;
use env::Env;
use eyre::Error;
use ledger::Ledger;
use log::{error, info};
use process::{backup::BackupBg, sessions::SessionsBg};
use tokio_cron_scheduler::{Job, JobScheduler};

pub mod process;

#[async_trait]
pub trait Task {
    const NAME: &'static str;

    async fn process(&mut self) -> Result<(), Error>;
}

pub async fn start(ledger: Ledger, env: &Env) -> Result<JobScheduler, Error> {
    let sched = JobScheduler::new().await?;
    sched
        .add(job(
            BackupBg::new(ledger.clone(), env.backup_dir().clone()),
            env.backup_cron(),
        )?)
        .await?;
    sched
        .add(job(SessionsBg::new(ledger), SessionsBg::CRON)?)
        .await?;
    sched.start().await?;
    Ok(sched)
}

fn job<T>(task: T, cron: &str) -> Result<Job, Error>
where
    T: Task + Clone + Send + Sync + 'static,
{
    info!("Scheduling {} at '{}'", T::NAME, cron);
    let job = Job::new_async(cron, move |_, _| {
        let mut task = task.clone();
        Box::pin(async move {
            info!("Running {}", T::NAME);
            if let Err(err) = task.process().await {
                error!("Failed to run {}: {:#}", T::NAME, err);
            }
        })
    })?;
    Ok(job)
}
