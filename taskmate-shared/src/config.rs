/// Settings shared by the API server and the reminder worker
///
/// Mail settings are read with the `config` crate from `MAIL_*` environment
/// variables; missing keys fall back to the serde defaults below.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::config::MailConfig;
///
/// # fn example() -> Result<(), config::ConfigError> {
/// // MAIL_SERVER=smtp.example.com MAIL_PORT=465 MAIL_SSL=true ...
/// let mail = MailConfig::from_env()?;
/// println!("sending through {}:{}", mail.server, mail.port);
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use std::time::Duration;

use crate::quota::DEFAULT_MAX_TASKS;

/// SMTP settings (`MAIL_*`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_from")]
    pub from: String,

    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub starttls: bool,

    #[serde(default)]
    pub ssl: bool,

    #[serde(default = "default_true")]
    pub use_credentials: bool,

    /// Upper bound for a single delivery attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_from() -> String {
    "Taskmate <noreply@taskmate.local>".into()
}
fn default_server() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            from: default_from(),
            server: default_server(),
            port: default_port(),
            starttls: true,
            ssl: false,
            use_credentials: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::with_prefix("MAIL"))
    }

    /// Loads from an explicit environment source (tests pass a map)
    pub fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Knobs the account and task services need
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Public URL used to build links in emails
    pub base_url: String,

    pub jwt_secret: String,

    pub access_token_ttl: chrono::Duration,

    pub max_tasks: u32,

    pub mail_timeout: Duration,
}

impl AccountSettings {
    pub fn new(base_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            jwt_secret: jwt_secret.into(),
            access_token_ttl: chrono::Duration::minutes(30),
            max_tasks: DEFAULT_MAX_TASKS,
            mail_timeout: Duration::from_secs(10),
        }
    }
}
