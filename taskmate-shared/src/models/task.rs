/// Task model and database operations
///
/// A task is a personal to-do item owned by exactly one user.
///
/// # Completion
///
/// ```text
/// is_completed = false, completed_at = NULL
///        │  complete           ▲
///        ▼                     │ reopen
/// is_completed = true,  completed_at = <timestamp>
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::models::task::{Task, CreateTask, TaskQuery, TaskSort};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, user_id, CreateTask {
///     title: "Buy milk".to_string(),
///     description: None,
///     due_date: None,
///     is_completed: false,
///     completed_at: None,
/// }).await?;
///
/// let query = TaskQuery { search: "milk".to_string(), sort: TaskSort::Title };
/// let tasks = Task::list_by_user(&pool, user_id, &query).await?;
/// assert!(tasks.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "id, user_id, title, description, due_date, is_completed, completed_at, created_at, updated_at";

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: bool,

    /// Set exactly while `is_completed` is true
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// `completed_at` is expected to be consistent with `is_completed`; the task
/// service normalizes it before it reaches the store.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: bool,

    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for updating a task
///
/// `None` leaves a column untouched. `completed_at: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: Option<bool>,

    pub completed_at: Option<Option<DateTime<Utc>>>,
}

/// Allowed sort keys for task listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    DueDate,
    Title,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
    IsCompleted,
}

impl TaskSort {
    pub const ALL: [TaskSort; 6] = [
        TaskSort::DueDate,
        TaskSort::Title,
        TaskSort::CreatedAt,
        TaskSort::UpdatedAt,
        TaskSort::CompletedAt,
        TaskSort::IsCompleted,
    ];

    /// Column name, also the accepted query-string value
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSort::DueDate => "due_date",
            TaskSort::Title => "title",
            TaskSort::CreatedAt => "created_at",
            TaskSort::UpdatedAt => "updated_at",
            TaskSort::CompletedAt => "completed_at",
            TaskSort::IsCompleted => "is_completed",
        }
    }

    /// Orders two tasks the way the SQL `ORDER BY` clause does
    /// (ascending, NULLs last, creation time as tie-breaker)
    pub fn compare(&self, a: &Task, b: &Task) -> std::cmp::Ordering {
        fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> std::cmp::Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        }

        let primary = match self {
            TaskSort::DueDate => nulls_last(&a.due_date, &b.due_date),
            TaskSort::Title => a.title.cmp(&b.title),
            TaskSort::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            TaskSort::CompletedAt => nulls_last(&a.completed_at, &b.completed_at),
            TaskSort::IsCompleted => a.is_completed.cmp(&b.is_completed),
        };

        primary.then_with(|| a.created_at.cmp(&b.created_at))
    }
}

impl fmt::Display for TaskSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a sort key is not one of [`TaskSort::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for TaskSort {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskSort::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Filter and ordering for task listings
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Case-sensitive substring the title must contain (empty matches all)
    pub search: String,

    pub sort: TaskSort,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        task.title.contains(&self.search)
    }
}

impl Task {
    /// Creates a task owned by `user_id`
    pub async fn create(pool: &PgPool, user_id: Uuid, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (user_id, title, description, due_date, is_completed, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.is_completed)
            .bind(data.completed_at)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID regardless of owner
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a task; only `Some` fields are written
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.is_completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_completed = ${}", bind_count));
        }
        if data.completed_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed_at = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(is_completed) = data.is_completed {
            q = q.bind(is_completed);
        }
        if let Some(completed_at) = data.completed_at {
            q = q.bind(completed_at);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task (attachments cascade)
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's tasks filtered by title substring and ordered by `query.sort`
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        query: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // The ORDER BY column comes from a closed enum, never from user input
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1 AND strpos(title, $2) > 0
            ORDER BY {} ASC NULLS LAST, created_at ASC
            "#,
            query.sort.as_str()
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(&query.search)
            .fetch_all(pool)
            .await
    }

    /// Counts the tasks owned by a user
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Lists every task due in `[start, end)`, ordered by owner then due date
    pub async fn list_due_between(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE due_date >= $1 AND due_date < $2
            ORDER BY user_id, due_date
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}
