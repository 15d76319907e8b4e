/// Report endpoints (bearer)
///
/// Every report answers 404 `there are no tasks` when the caller has none.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use taskmate_shared::{
    auth::middleware::AuthContext,
    error::ServiceError,
    reports::{self, AverageReport, CountReport, DayReport, MaxReport, OverdueReport},
    store::UserRepository,
};

pub async fn count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CountReport>> {
    let tasks = state.tasks().all(auth.user_id).await?;

    Ok(Json(reports::count(&tasks)))
}

/// Completed tasks per day since the account was created
pub async fn average(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AverageReport>> {
    let tasks = state.tasks().all(auth.user_id).await?;

    let user = state
        .store
        .find_user(auth.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ApiError::Unauthorized("could not validate credentials".to_string()))?;

    Ok(Json(reports::average(&tasks, user.created_at, Utc::now())))
}

pub async fn overdue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<OverdueReport>> {
    let tasks = state.tasks().all(auth.user_id).await?;

    Ok(Json(reports::overdue(&tasks, Utc::now())))
}

/// Day with the most completed tasks
pub async fn max(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MaxReport>> {
    let tasks = state.tasks().all(auth.user_id).await?;

    reports::max(&tasks)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no completed tasks".to_string()))
}

pub async fn day(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DayReport>> {
    let tasks = state.tasks().all(auth.user_id).await?;

    Ok(Json(reports::day(&tasks)))
}
