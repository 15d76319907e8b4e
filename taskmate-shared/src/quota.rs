/// Per-user task quota
///
/// Each user may own at most `MAX_TASKS` tasks (default 50). The check
/// happens before insert; two concurrent creates at the boundary may both
/// pass.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::quota::check_task_quota;
/// use taskmate_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(store: MemoryStore, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let result = check_task_quota(&store, user_id, 50).await?;
/// if !result.allowed {
///     println!("Task quota exhausted: {}/{}", result.current, result.limit);
/// }
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::store::{StoreResult, TaskRepository};

/// Default number of tasks a user may own
pub const DEFAULT_MAX_TASKS: u32 = 50;

/// Result of quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCheckResult {
    /// Whether one more task may be created
    pub allowed: bool,

    pub current: u32,

    pub limit: u32,

    pub remaining: u32,
}

impl QuotaCheckResult {
    /// Evaluates `current` usage against `limit`
    pub fn evaluate(current: u32, limit: u32) -> Self {
        if current >= limit {
            QuotaCheckResult {
                allowed: false,
                current,
                limit,
                remaining: 0,
            }
        } else {
            QuotaCheckResult {
                allowed: true,
                current,
                limit,
                remaining: limit - current,
            }
        }
    }
}

/// Counts the user's tasks and compares against `limit`
pub async fn check_task_quota<R>(
    tasks: &R,
    user_id: Uuid,
    limit: u32,
) -> StoreResult<QuotaCheckResult>
where
    R: TaskRepository + ?Sized,
{
    let current = tasks.count_tasks(user_id).await?;
    let current = u32::try_from(current).unwrap_or(u32::MAX);

    Ok(QuotaCheckResult::evaluate(current, limit))
}
