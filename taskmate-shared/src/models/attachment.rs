/// Attachment model and database operations
///
/// Attachments are binary files stored inline (`BYTEA`) and owned by a task.
/// They are removed automatically when the parent task is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE attachments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     file_name VARCHAR(255) NOT NULL,
///     file_data BYTEA NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored attachment including its contents
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,

    pub task_id: Uuid,

    pub file_name: String,

    pub file_data: Vec<u8>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating an attachment
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub file_name: String,

    pub file_data: Vec<u8>,
}

impl Attachment {
    /// Stores a new attachment for `task_id`
    ///
    /// # Errors
    ///
    /// Fails with a foreign-key violation if the task does not exist.
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        data: CreateAttachment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (task_id, file_name, file_data)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, file_name, file_data, created_at
            "#,
        )
        .bind(task_id)
        .bind(data.file_name)
        .bind(data.file_data)
        .fetch_one(pool)
        .await
    }

    /// Finds an attachment that belongs to `task_id`
    pub async fn find_for_task(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, file_name, file_data, created_at
            FROM attachments
            WHERE id = $1 AND task_id = $2
            "#,
        )
        .bind(id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    pub fn size(&self) -> usize {
        self.file_data.len()
    }
}
