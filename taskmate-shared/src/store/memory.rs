/// In-memory store
///
/// Mirrors the PostgreSQL schema's constraints: case-insensitive unique
/// emails, unique token values, one token per user, and cascading deletes
/// from tasks to attachments. All state lives behind a single mutex, which
/// is never held across an await point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    AttachmentRepository, Store, StoreError, StoreResult, TaskRepository, UserRepository,
    VerificationRepository, USERS_EMAIL_KEY, VERIFICATION_TOKEN_KEY,
};
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::task::{CreateTask, Task, TaskQuery, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::models::verification::VerificationToken;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    attachments: HashMap<Uuid, Attachment>,
    /// Keyed by user
    tokens: HashMap<Uuid, VerificationToken>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic in another test thread must not cascade into every caller
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored tokens (all users)
    pub fn token_count(&self) -> usize {
        self.lock().tokens.len()
    }

    /// Number of stored attachments (all tasks)
    pub fn attachment_count(&self) -> usize {
        self.lock().attachments.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.lock();

        if tables.email_taken(&data.email, None) {
            return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            is_verified: data.is_verified,
            is_oauth: data.is_oauth,
            created_at: now,
            updated_at: now,
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.lock();

        if let Some(email) = data.email.as_deref() {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = data.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = data.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(verified) = data.is_verified {
            user.is_verified = verified;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, user_id: Uuid, data: CreateTask) -> StoreResult<Task> {
        let mut tables = self.lock();

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference);
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            is_completed: data.is_completed,
            completed_at: data.completed_at,
            created_at: now,
            updated_at: now,
        };

        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.lock().tasks.get(&id).cloned())
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tables = self.lock();

        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = Some(description);
        }
        if let Some(due_date) = data.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(is_completed) = data.is_completed {
            task.is_completed = is_completed;
        }
        if let Some(completed_at) = data.completed_at {
            task.completed_at = completed_at;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();

        if tables.tasks.remove(&id).is_none() {
            return Ok(false);
        }

        tables.attachments.retain(|_, a| a.task_id != id);
        Ok(true)
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && query.matches(t))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| query.sort.compare(a, b));
        Ok(tasks)
    }

    async fn count_tasks(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .lock()
            .tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .count() as i64)
    }

    async fn tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .values()
            .filter(|t| matches!(t.due_date, Some(due) if due >= start && due < end))
            .cloned()
            .collect();

        tasks.sort_by_key(|t| (t.user_id, t.due_date));
        Ok(tasks)
    }
}

#[async_trait]
impl AttachmentRepository for MemoryStore {
    async fn create_attachment(
        &self,
        task_id: Uuid,
        data: CreateAttachment,
    ) -> StoreResult<Attachment> {
        let mut tables = self.lock();

        if !tables.tasks.contains_key(&task_id) {
            return Err(StoreError::MissingReference);
        }

        let attachment = Attachment {
            id: Uuid::new_v4(),
            task_id,
            file_name: data.file_name,
            file_data: data.file_data,
            created_at: Utc::now(),
        };

        tables.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn find_attachment(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Attachment>> {
        Ok(self
            .lock()
            .attachments
            .get(&id)
            .filter(|a| a.task_id == task_id)
            .cloned())
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn replace_token(
        &self,
        user_id: Uuid,
        token: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<VerificationToken> {
        let mut tables = self.lock();

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference);
        }

        let collides = tables
            .tokens
            .values()
            .any(|t| t.token == token && t.user_id != user_id);
        if collides {
            return Err(StoreError::UniqueViolation(VERIFICATION_TOKEN_KEY.to_string()));
        }

        let record = VerificationToken {
            user_id,
            token,
            expires_at,
            created_at: Utc::now(),
        };

        tables.tokens.insert(user_id, record.clone());
        Ok(record)
    }

    async fn find_token(&self, token: i32) -> StoreResult<Option<VerificationToken>> {
        Ok(self
            .lock()
            .tokens
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn find_token_for_user(&self, user_id: Uuid) -> StoreResult<Option<VerificationToken>> {
        Ok(self.lock().tokens.get(&user_id).cloned())
    }

    async fn delete_token(&self, token: i32) -> StoreResult<bool> {
        let mut tables = self.lock();
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| t.token != token);
        Ok(tables.tokens.len() < before)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
