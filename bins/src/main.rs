use dotenv::dotenv;
use eyre::Context;
use log::{info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let dotenv = dotenv();
    pretty_env_logger::init();
    color_eyre::install()?;
    if let Err(err) = dotenv {
        warn!("No .env loaded: {}", err);
    }
    let env = env::Env::load()?;

    info!("connecting to mongo");
    let storage = storage::Storage::new(env.mongo_url())
        .await
        .context("Failed to create storage")?;
    info!("creating ledger");
    let ledger = ledger::Ledger::new(storage);

    let mut args = std::env::args().skip(1);
    if let Some(cmd) = args.next() {
        return match (cmd.as_str(), args.next()) {
            ("restore", Some(path)) => {
                let dump = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path))?;
                let mut tx = ledger.db.start_session().await?;
                ledger.backup.apply_backup(&mut tx, &dump).await?;
                info!("Restored {}", path);
                Ok(())
            }
            _ => Err(eyre::eyre!("Usage: studio-cli [restore <backup.zip>]")),
        };
    }

    let _sched = bg_process::start(ledger.clone(), &env)
        .await
        .context("Failed to start background jobs")?;
    info!("Starting rpc...");
    rpc::serve(ledger, &env).await?;
    Ok(())
}
