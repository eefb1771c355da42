// One crawl pass: refresh due classifications, then discover event pages

use anyhow::{Context, Result};
use meet_crawler::{Config, HttpProber, Orchestrator, PostgresStore, ProberExt};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meet_crawler=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        policy = %config.policy,
        classify_policy = ?config.crawler.classify_policy.as_ref().map(ToString::to_string),
        base_url = %config.crawler.base_url,
        "Configuration loaded"
    );

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.crawler.concurrency as u32 + 2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let store = PostgresStore::from_pool(pool);
    store.migrate().await.context("Failed to run migrations")?;

    let prober = HttpProber::new(&config.crawler)
        .context("Failed to build HTTP client")?
        .rate_limited(config.crawler.requests_per_second);

    let orchestrator = Orchestrator::new(prober, store, config.crawler.clone())
        .context("Invalid crawler configuration")?;

    let report = orchestrator
        .run(&config.policy)
        .await
        .context("Failed to select meets")?;

    for (generation, meets) in &report.discovered {
        tracing::info!(generation = %generation, meets, "Discovered");
    }
    if report.timed_out {
        tracing::warn!("Pass stopped at the run timeout");
    }

    Ok(())
}
