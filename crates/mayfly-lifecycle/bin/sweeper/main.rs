mod cli;

use crate::cli::Cli;
use anyhow::Context;
use clap::Parser;
use mayfly_lifecycle::{Reconciler, ReconcilerSettings};
use mayfly_storage::PgLinkStore;
use mayfly_tracker::RedisDeadlineIndex;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Cli::parse();

    info!(
        tick_interval_secs = config.tick_interval_secs,
        audit_every_ticks = config.audit_every_ticks,
        "starting expired-link sweeper"
    );

    let store = PgLinkStore::connect(&config.postgres_dsn)
        .await
        .context("failed to connect to Postgres")?;

    let redis_client =
        redis::Client::open(config.redis_url.as_str()).context("invalid Redis URL")?;
    let redis_conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to Redis")?;
    let tracker = RedisDeadlineIndex::with_prefix(redis_conn, config.key_prefix.clone());

    let settings = ReconcilerSettings::builder()
        .tick_interval(config.tick_interval())
        .audit_every_ticks(config.audit_every_ticks)
        .build();

    let reconciler = Reconciler::with_settings(Arc::new(store), Arc::new(tracker), settings);
    reconciler.run().await;

    Ok(())
}
