/// Verification token model and database operations
///
/// A verification token is a 6-digit one-time code bound to a user, used
/// both for email verification and for password reset. The table's primary
/// key is `user_id`, so a user holds at most one live token.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE verification_tokens (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     token INTEGER NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored verification token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationToken {
    pub user_id: Uuid,

    pub token: i32,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// A token is live strictly before its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Replaces the user's token inside a single transaction
    ///
    /// The old row is deleted and the new one inserted atomically, so
    /// concurrent readers never observe zero or two tokens for the user.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation (`verification_tokens_token_key`) if
    /// another user currently holds the same token value.
    pub async fn replace_for_user(
        pool: &PgPool,
        user_id: Uuid,
        token: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, token, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Finds a token by its value
    pub async fn find_by_token(pool: &PgPool, token: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, VerificationToken>(
            "SELECT user_id, token, expires_at, created_at FROM verification_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Finds the live token of a user, if any
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, VerificationToken>(
            "SELECT user_id, token, expires_at, created_at FROM verification_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a token by value
    ///
    /// # Returns
    ///
    /// True if a row was removed
    pub async fn delete_by_token(pool: &PgPool, token: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
