use anyhow::Result;
use tokio_util::sync::CancellationToken;

use boardwatch::config::Config;
use boardwatch::{db, Core};

/// Initialize logging with tracing_subscriber.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sqlx=warn".parse().unwrap())
                .add_directive("boardwatch=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .compact()
        .with_target(false)
        .with_ansi(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();
    let pool = db::init_db(&config).await?;

    let core = Core::new(config, pool)?;
    log::info!("Core initialized, starting scheduler");

    let shutdown = CancellationToken::new();
    let scheduler = core.scheduler.clone();
    let shutdown_for_runner = shutdown.clone();
    let runner = tokio::spawn(Box::pin(async move {
        scheduler.run_forever(shutdown_for_runner).await
    }));

    tokio::signal::ctrl_c().await?;
    log::info!("Interrupt received, shutting down");
    shutdown.cancel();
    runner.await?;

    core.pool.close().await;
    log::info!("Shutdown complete");
    Ok(())
}
