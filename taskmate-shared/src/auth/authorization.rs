/// Authorization checks
///
/// Side-effect-free predicates run before any mutation:
///
/// 1. **Self-service**: a user may only modify their own account
/// 2. **Ownership**: a task is only visible to the user who created it
/// 3. **Verification**: unverified accounts cannot log in or reset passwords
/// 4. **Quota**: task creation stops at the per-user cap
///
/// Functions are generic over the repository so they accept both concrete
/// stores and `&dyn Store`.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::auth::authorization::{require_self, require_task_owner};
/// use taskmate_shared::auth::middleware::AuthContext;
/// use taskmate_shared::error::ServiceResult;
/// use taskmate_shared::store::Store;
/// use uuid::Uuid;
///
/// async fn check(store: &dyn Store, auth: &AuthContext, task_id: Uuid) -> ServiceResult<()> {
///     require_self(auth, auth.user_id)?;
///     let task = require_task_owner(store, auth.user_id, task_id).await?;
///     println!("{} belongs to the caller", task.title);
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::task::Task;
use crate::models::user::User;
use crate::quota::check_task_quota;
use crate::store::{StoreResult, TaskRepository, UserRepository};

/// Loads a task the caller owns
///
/// # Errors
///
/// - `NotFound` when no task has this ID
/// - `Forbidden` when it belongs to another user
pub async fn require_task_owner<R>(tasks: &R, user_id: Uuid, task_id: Uuid) -> ServiceResult<Task>
where
    R: TaskRepository + ?Sized,
{
    let task = tasks
        .find_task(task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("task with id: {} does not exist", task_id)))?;

    if task.user_id != user_id {
        return Err(ServiceError::Forbidden);
    }

    Ok(task)
}

pub fn is_verified(user: &User) -> bool {
    user.is_verified
}

/// True while the user owns fewer than `limit` tasks
pub async fn under_task_limit<R>(tasks: &R, user_id: Uuid, limit: u32) -> StoreResult<bool>
where
    R: TaskRepository + ?Sized,
{
    Ok(check_task_quota(tasks, user_id, limit).await?.allowed)
}

/// True if no account uses `email` (case-insensitive)
pub async fn email_available<R>(users: &R, email: &str) -> StoreResult<bool>
where
    R: UserRepository + ?Sized,
{
    Ok(users.find_user_by_email(email).await?.is_none())
}

/// Fails with `Unauthorized` unless the caller is `user_id`
pub fn require_self(auth: &AuthContext, user_id: Uuid) -> ServiceResult<()> {
    if auth.user_id != user_id {
        return Err(ServiceError::Unauthorized);
    }

    Ok(())
}
