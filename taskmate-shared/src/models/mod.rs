/// Database models for Taskmate
///
/// Plain row structs with their SQL operations. Services never call these
/// directly; they go through the repository traits in [`crate::store`].
///
/// # Models
///
/// - `user`: User accounts (password and OAuth)
/// - `task`: Personal to-do tasks
/// - `attachment`: Files attached to tasks
/// - `verification`: One-time verification / password-reset tokens
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::models::user::{User, CreateUser};
/// use taskmate_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: Some("John".to_string()),
///     last_name: Some("Doe".to_string()),
///     is_verified: false,
///     is_oauth: false,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod attachment;
pub mod task;
pub mod user;
pub mod verification;
