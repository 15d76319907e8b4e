/// Database layer for Taskmate
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskmate_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

/// Returns the violated constraint name if `err` is a unique violation (SQLSTATE 23505)
///
/// ```no_run
/// # use taskmate_shared::db::unique_violation;
/// # fn example(err: sqlx::Error) {
/// if unique_violation(&err) == Some("users_email_key") {
///     // duplicate email
/// }
/// # }
/// ```
pub fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            db_err.constraint()
        }
        _ => None,
    }
}
