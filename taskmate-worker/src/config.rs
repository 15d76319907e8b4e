/// Worker configuration
///
/// Each group is read with the `config` crate from prefixed environment
/// variables, after `dotenvy` has loaded `.env`:
///
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS`
/// - `REMINDER_INTERVAL_SECS`, `REMINDER_WINDOW_MINUTES`
/// - `MAIL_*` (see [`MailConfig`])

use anyhow::Context;
use config::{ConfigError, Environment};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use taskmate_shared::config::MailConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseSettings,

    pub reminder: ReminderConfig,

    pub mail: MailConfig,
}

/// `DATABASE_*`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// `REMINDER_*`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between wake-ups
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Minutes after midnight UTC during which a wake-up sends reminders
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_interval_secs() -> u64 {
    300
}
fn default_window_minutes() -> i64 {
    5
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            window_minutes: default_window_minutes(),
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database: DatabaseSettings = load(Environment::with_prefix("DATABASE"))
            .context("DATABASE_URL must be set")?;
        let reminder: ReminderConfig =
            load(Environment::with_prefix("REMINDER")).context("invalid REMINDER_* settings")?;
        let mail = MailConfig::from_env().context("invalid MAIL_* settings")?;

        if reminder.interval_secs == 0 {
            anyhow::bail!("REMINDER_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            database,
            reminder,
            mail,
        })
    }
}

/// Deserializes one prefixed group of variables
pub fn load<T: DeserializeOwned>(source: Environment) -> Result<T, ConfigError> {
    config::Config::builder()
        .add_source(source.try_parsing(true))
        .build()?
        .try_deserialize()
}
