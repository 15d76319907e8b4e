/// PostgreSQL-backed store
///
/// Delegates to the active-record style models in [`crate::models`] and
/// converts driver errors into [`StoreError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AttachmentRepository, Store, StoreResult, TaskRepository, UserRepository,
    VerificationRepository,
};
use crate::db::pool::health_check;
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::task::{CreateTask, Task, TaskQuery, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::models::verification::VerificationToken;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create_task(&self, user_id: Uuid, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, user_id, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, data).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_user(&self.pool, user_id, query).await?)
    }

    async fn count_tasks(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(Task::count_by_user(&self.pool, user_id).await?)
    }

    async fn tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        Ok(Task::list_due_between(&self.pool, start, end).await?)
    }
}

#[async_trait]
impl AttachmentRepository for PgStore {
    async fn create_attachment(
        &self,
        task_id: Uuid,
        data: CreateAttachment,
    ) -> StoreResult<Attachment> {
        Ok(Attachment::create(&self.pool, task_id, data).await?)
    }

    async fn find_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Attachment>> {
        Ok(Attachment::find_for_task(&self.pool, task_id, id).await?)
    }
}

#[async_trait]
impl VerificationRepository for PgStore {
    async fn replace_token(
        &self,
        user_id: Uuid,
        token: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken> {
        Ok(VerificationToken::replace_for_user(&self.pool, user_id, token, expires_at).await?)
    }

    async fn find_token(&self, token: i32) -> StoreResult<Option<VerificationToken>> {
        Ok(VerificationToken::find_by_token(&self.pool, token).await?)
    }

    async fn find_token_for_user(&self, user_id: Uuid) -> StoreResult<Option<VerificationToken>> {
        Ok(VerificationToken::find_by_user(&self.pool, user_id).await?)
    }

    async fn delete_token(&self, token: i32) -> StoreResult<bool> {
        Ok(VerificationToken::delete_by_token(&self.pool, token).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
