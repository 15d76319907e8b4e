//! # Taskmate API Server
//!
//! Serves account, task, attachment and report endpoints over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskmate-api
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskmate_api::{
    app::{build_router, AppState},
    config::Config,
    oauth::{GoogleProvider, IdentityProvider},
};
use taskmate_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    mail::smtp::SmtpMailer,
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskmate_api=debug,tower_http=debug".into());

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

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first so .env can set RUST_LOG / LOG_FORMAT
    let config = Config::from_env()?;

    init_tracing();

    tracing::info!(
        "Taskmate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("failed to connect to database")?;

    run_migrations(&pool).await.context("failed to run migrations")?;

    let mailer = SmtpMailer::new(&config.mail).context("invalid mail configuration")?;

    let identity: Option<Arc<dyn IdentityProvider>> = match config.google.clone() {
        Some(google) => Some(Arc::new(GoogleProvider::new(google)?)),
        None => {
            tracing::info!("Google sign-in disabled (GOOGLE_* not set)");
            None
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(mailer),
        identity,
        config,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
