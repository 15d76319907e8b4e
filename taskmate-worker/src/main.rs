//! # Taskmate Worker
//!
//! Sends the daily "due today" reminder mail.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskmate-worker
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskmate_shared::{
    db::pool::{close_pool, create_pool, DatabaseConfig},
    mail::smtp::SmtpMailer,
    store::postgres::PgStore,
};
use taskmate_worker::{config::WorkerConfig, scheduler::ReminderScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "taskmate_worker=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;

    init_tracing();

    tracing::info!(
        "Taskmate Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("failed to connect to database")?;

    let mailer = SmtpMailer::new(&config.mail).context("invalid mail configuration")?;

    let scheduler = ReminderScheduler::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(mailer),
        config.reminder.clone(),
        config.mail.timeout(),
    );

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
        tracing::info!("Shutdown signal received, exiting...");
        shutdown.cancel();
    });

    scheduler.run().await;

    close_pool(pool).await;

    Ok(())
}
