use chrono::Utc;
use dotenv::dotenv;
use pocket_feed_sync::{Config, JobError, SyncInvocation};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    if let Err(error) = run().await {
        log::error!("Sync failed: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), JobError> {
    let started_at = Utc::now();
    let config = Config::from_env()?;

    let report = SyncInvocation::from_config(&config)?
        .execute(started_at)
        .await?;

    log::info!(
        "Finished sync: {} delivered, {} failed",
        report.delivered(),
        report.delivery_failures.len()
    );

    Ok(())
}
