/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `BASE_URL`: Public URL used in emailed links (default: http://localhost:8080)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES`: Access token lifetime (default: 30)
/// - `MAX_TASKS`: Per-user task cap (default: 50)
/// - `MAX_UPLOAD_BYTES`: Attachment size limit (default: 10 MiB)
/// - `MAIL_*`: SMTP settings, see [`MailConfig`]
/// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URL`:
///   Google sign-in; disabled unless all three are set
///
/// # Example
///
/// ```no_run
/// use taskmate_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use taskmate_shared::config::{AccountSettings, MailConfig};
use taskmate_shared::quota::DEFAULT_MAX_TASKS;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub tasks: TaskConfig,

    pub mail: MailConfig,

    /// `None` when Google sign-in is not configured
    pub google: Option<GoogleConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Public base URL, used to build links in emails
    pub base_url: String,

    pub cors_origins: Vec<String>,

    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_token_expire_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub max_tasks: u32,
}

/// Google OAuth client credentials
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,

    pub client_secret: String,

    pub redirect_url: String,
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let mail = MailConfig::from_env().context("invalid MAIL_* configuration")?;

        Self::from_lookup(|key| env::var(key).ok(), mail)
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(get: F, mail: MailConfig) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let google = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&get, "API_PORT", 8080)?,
                base_url: get("BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
                cors_origins,
                max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_token_expire_minutes: parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            },
            tasks: TaskConfig {
                max_tasks: parse_or(&get, "MAX_TASKS", DEFAULT_MAX_TASKS)?,
            },
            mail,
            google,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Settings handed to the account and task services
    pub fn account_settings(&self) -> AccountSettings {
        AccountSettings {
            base_url: self.api.base_url.clone(),
            jwt_secret: self.jwt.secret.clone(),
            access_token_ttl: chrono::Duration::minutes(self.jwt.access_token_expire_minutes),
            max_tasks: self.tasks.max_tasks,
            mail_timeout: Duration::from_secs(self.mail.timeout_secs),
        }
    }
}
