/// Persistence boundary
///
/// Services talk to storage only through the repository traits defined
/// here. Two implementations ship with the crate:
///
/// - [`postgres::PgStore`]: production store backed by the SQL models
/// - [`memory::MemoryStore`]: in-process store with the same constraint
///   behavior, used by the API router tests and local experiments
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmate_shared::store::{Store, postgres::PgStore};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::task::{CreateTask, Task, TaskQuery, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::models::verification::VerificationToken;

/// Unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Unique constraint on `verification_tokens.token`
pub const VERIFICATION_TOKEN_KEY: &str = "verification_tokens_token_key";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (constraint name attached)
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A referenced row does not exist
    #[error("referenced record not found")]
    MissingReference,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// True if the error is a unique violation of `constraint`
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = crate::db::unique_violation(&err) {
            return StoreError::UniqueViolation(constraint.to_string());
        }

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23503") {
                return StoreError::MissingReference;
            }
        }

        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::UniqueViolation`] (`users_email_key`) on a
    /// case-insensitive email collision
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&self, user_id: Uuid, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;

    /// Deletes the task and its attachments; false if it didn't exist
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    async fn count_tasks(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Every task (any owner) due in `[start, end)`, grouped by owner
    async fn tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>>;
}

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn create_attachment(
        &self,
        task_id: Uuid,
        data: CreateAttachment,
    ) -> StoreResult<Attachment>;

    /// Finds an attachment only if it belongs to `task_id`
    async fn find_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Attachment>>;
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Atomically drops the user's previous token and stores the new one
    ///
    /// Fails with [`StoreError::UniqueViolation`] (`verification_tokens_token_key`)
    /// when another user holds the same value; the previous token survives.
    async fn replace_token(
        &self,
        user_id: Uuid,
        token: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken>;

    async fn find_token(&self, token: i32) -> StoreResult<Option<VerificationToken>>;

    async fn find_token_for_user(&self, user_id: Uuid) -> StoreResult<Option<VerificationToken>>;

    async fn delete_token(&self, token: i32) -> StoreResult<bool>;
}

/// Everything the services need from storage
#[async_trait]
pub trait Store:
    UserRepository + TaskRepository + AttachmentRepository + VerificationRepository
{
    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unique_violation_matches_constraint_name() {
        let err = StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string());
        assert!(err.is_unique_violation(USERS_EMAIL_KEY));
        assert!(!err.is_unique_violation(VERIFICATION_TOKEN_KEY));
        assert!(!StoreError::MissingReference.is_unique_violation(USERS_EMAIL_KEY));
    }

    #[test]
    fn test_non_database_sqlx_error_maps_to_database() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
