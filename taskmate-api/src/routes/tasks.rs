/// Task endpoints (bearer)
///
/// - `POST /tasks` - Create (201); 403 once the per-user cap is reached
/// - `GET /tasks?search=&sort=` - List own tasks (200)
/// - `GET /tasks/:id` - Fetch (200)
/// - `PUT|PATCH /tasks/:id` - Update (200)
/// - `DELETE /tasks/:id` - Delete (204)
///
/// Tasks owned by another user answer 403; unknown IDs answer 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskmate_shared::{
    auth::middleware::AuthContext,
    error::ServiceError,
    models::task::{TaskQuery, TaskSort},
    tasks::{NewTask, TaskChanges},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_completed: bool,

    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub is_completed: Option<bool>,

    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: String,

    pub sort: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<TaskQuery, ApiError> {
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => TaskSort::default(),
            Some(raw) => raw
                .parse::<TaskSort>()
                .map_err(|e| ServiceError::validation("sort", e.to_string()))?,
        };

        Ok(TaskQuery {
            search: self.search,
            sort,
        })
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let task = state
        .tasks()
        .create(
            auth.user_id,
            NewTask {
                title: req.title,
                description: req.description,
                due_date: req.due_date,
                is_completed: req.is_completed,
                completed_at: req.completed_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Lists the caller's tasks
///
/// `search` is a case-sensitive title substring; `sort` is one of
/// `due_date` (default), `title`, `created_at`, `updated_at`,
/// `completed_at`, `is_completed`. Missing values sort last.
///
/// # Errors
///
/// - `404 Not Found`: No task matches
/// - `422 Unprocessable Entity`: Unknown sort key
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let query = params.into_query()?;

    let tasks = state.tasks().list(auth.user_id, &query).await?;

    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let task = state.tasks().get(auth.user_id, id).await?;

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let task = state
        .tasks()
        .update(
            auth.user_id,
            id,
            TaskChanges {
                title: req.title,
                description: req.description,
                due_date: req.due_date,
                is_completed: req.is_completed,
                completed_at: req.completed_at,
            },
        )
        .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks().delete(auth.user_id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
