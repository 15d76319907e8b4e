/// Task and attachment operations
///
/// Every operation runs the ownership check first: a missing task is
/// `NotFound`, a task owned by someone else is `Forbidden`.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::tasks::{NewTask, Tasks};
/// use taskmate_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let tasks = Tasks::new(&store, 50);
///
/// let task = tasks.create(user_id, NewTask::titled("Buy milk")).await?;
/// tasks.delete(user_id, task.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_task_owner, under_task_limit};
use crate::error::{ServiceError, ServiceResult};
use crate::models::attachment::{Attachment, CreateAttachment};
use crate::models::task::{CreateTask, Task, TaskQuery, UpdateTask};
use crate::store::Store;

const MAX_TITLE_LEN: usize = 255;

const MAX_FILE_NAME_LEN: usize = 255;

/// Task creation input
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: bool,

    pub completed_at: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Task update input; only supplied fields change
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: Option<bool>,

    pub completed_at: Option<DateTime<Utc>>,
}

/// Column writes implied by a completion change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub is_completed: Option<bool>,

    /// `Some(None)` clears the column
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

/// Computes how `is_completed` / `completed_at` change on update
///
/// | current    | requested | result                                  |
/// |------------|-----------|-----------------------------------------|
/// | incomplete | `true`    | completed, `completed_at` = supplied or now |
/// | completed  | `true`    | `completed_at` replaced only if supplied |
/// | any        | `false`   | incomplete, `completed_at` cleared      |
/// | completed  | absent    | `completed_at` replaced only if supplied |
/// | incomplete | absent    | untouched                               |
pub fn completion_transition(
    current: &Task,
    requested: Option<bool>,
    supplied_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CompletionUpdate {
    match (requested, current.is_completed) {
        (Some(true), false) => CompletionUpdate {
            is_completed: Some(true),
            completed_at: Some(Some(supplied_at.unwrap_or(now))),
        },
        (Some(false), _) => CompletionUpdate {
            is_completed: Some(false),
            completed_at: Some(None),
        },
        (Some(true), true) | (None, true) => CompletionUpdate {
            is_completed: None,
            completed_at: supplied_at.map(Some),
        },
        (None, false) => CompletionUpdate {
            is_completed: None,
            completed_at: None,
        },
    }
}

fn validate_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::validation(
            "title",
            format!("must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

pub struct Tasks<'a> {
    store: &'a dyn Store,
    max_tasks: u32,
}

impl<'a> Tasks<'a> {
    pub fn new(store: &'a dyn Store, max_tasks: u32) -> Self {
        Self { store, max_tasks }
    }

    /// Creates a task for `user_id`
    ///
    /// # Errors
    ///
    /// `MaxResourceLimitReached` once the user owns `max_tasks` tasks
    pub async fn create(&self, user_id: Uuid, input: NewTask) -> ServiceResult<Task> {
        validate_title(&input.title)?;

        if !under_task_limit(self.store, user_id, self.max_tasks).await? {
            info!(user_id = %user_id, limit = self.max_tasks, "Task quota reached");
            return Err(ServiceError::MaxResourceLimitReached {
                limit: self.max_tasks,
            });
        }

        let completed_at = if input.is_completed {
            Some(input.completed_at.unwrap_or_else(Utc::now))
        } else {
            None
        };

        let task = self
            .store
            .create_task(
                user_id,
                CreateTask {
                    title: input.title,
                    description: input.description,
                    due_date: input.due_date,
                    is_completed: input.is_completed,
                    completed_at,
                },
            )
            .await?;

        info!(user_id = %user_id, task_id = %task.id, "Task created");
        Ok(task)
    }

    pub async fn get(&self, user_id: Uuid, task_id: Uuid) -> ServiceResult<Task> {
        require_task_owner(self.store, user_id, task_id).await
    }

    pub async fn update(&self, user_id: Uuid, task_id: Uuid, changes: TaskChanges) -> ServiceResult<Task> {
        let current = require_task_owner(self.store, user_id, task_id).await?;

        if let Some(title) = changes.title.as_deref() {
            validate_title(title)?;
        }

        let completion =
            completion_transition(&current, changes.is_completed, changes.completed_at, Utc::now());

        let update = UpdateTask {
            title: changes.title,
            description: changes.description,
            due_date: changes.due_date,
            is_completed: completion.is_completed,
            completed_at: completion.completed_at,
        };

        if update == UpdateTask::default() {
            return Ok(current);
        }

        let task = self
            .store
            .update_task(task_id, update)
            .await?
            .ok_or_else(|| task_not_found(task_id))?;

        info!(user_id = %user_id, task_id = %task_id, "Task updated");
        Ok(task)
    }

    pub async fn delete(&self, user_id: Uuid, task_id: Uuid) -> ServiceResult<()> {
        require_task_owner(self.store, user_id, task_id).await?;

        if !self.store.delete_task(task_id).await? {
            return Err(task_not_found(task_id));
        }

        info!(user_id = %user_id, task_id = %task_id, "Task deleted");
        Ok(())
    }

    /// Lists the user's tasks
    ///
    /// # Errors
    ///
    /// `NotFound("there are no tasks")` when nothing matches
    pub async fn list(&self, user_id: Uuid, query: &TaskQuery) -> ServiceResult<Vec<Task>> {
        let tasks = self.store.list_tasks(user_id, query).await?;

        if tasks.is_empty() {
            return Err(ServiceError::not_found("there are no tasks"));
        }

        Ok(tasks)
    }

    /// All tasks of a user (reports)
    pub async fn all(&self, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        self.list(user_id, &TaskQuery::default()).await
    }

    pub async fn attach(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        file_name: String,
        data: Vec<u8>,
    ) -> ServiceResult<Attachment> {
        require_task_owner(self.store, user_id, task_id).await?;

        if file_name.trim().is_empty() {
            return Err(ServiceError::validation("file", "file name must not be empty"));
        }
        if file_name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(ServiceError::validation(
                "file",
                format!("file name must be at most {} characters", MAX_FILE_NAME_LEN),
            ));
        }

        let attachment = self
            .store
            .create_attachment(
                task_id,
                CreateAttachment {
                    file_name,
                    file_data: data,
                },
            )
            .await?;

        info!(
            task_id = %task_id,
            attachment_id = %attachment.id,
            size = attachment.size(),
            "File attached"
        );
        Ok(attachment)
    }

    pub async fn download(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        attachment_id: Uuid,
    ) -> ServiceResult<Attachment> {
        require_task_owner(self.store, user_id, task_id).await?;

        self.store
            .find_attachment(task_id, attachment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("file with id: {} not found", attachment_id)))
    }
}

fn task_not_found(task_id: Uuid) -> ServiceError {
    ServiceError::not_found(format!("task with id: {} does not exist", task_id))
}
