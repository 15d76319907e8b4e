/// Verification-token lifecycle
///
/// One-time 6-digit codes, valid for 24 hours, shared by email verification
/// and password reset.
///
/// ```text
///            issue (replaces any previous token of the user)
///   (none) ─────────────► live ──── consume ────► (none)
///                          │
///                          └── now >= expires_at ──► expired (rejected, not swept)
/// ```
///
/// # Invariants
///
/// - At most one token per user; issuing replaces the old one atomically
/// - Token values are unique across users (collisions are retried)
/// - A consumed token can never be validated again
///
/// All operations take `now` explicitly so expiry is testable.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::ops::RangeInclusive;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::verification::VerificationToken;
use crate::store::{VerificationRepository, VERIFICATION_TOKEN_KEY};

pub const TOKEN_RANGE: RangeInclusive<i32> = 100_000..=999_999;

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Attempts before a token collision is reported as an error
const MAX_ISSUE_ATTEMPTS: usize = 3;

fn random_token() -> i32 {
    rand::thread_rng().gen_range(TOKEN_RANGE)
}

/// Parses a token from a query string value
///
/// Anything that is not a 6-digit number can never match a stored token.
pub fn parse_token(raw: &str) -> ServiceResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|t| TOKEN_RANGE.contains(t))
        .ok_or(ServiceError::InvalidOrExpiredToken)
}

/// Issues a fresh token for `user_id`, replacing any previous one
pub async fn issue<R>(repo: &R, user_id: Uuid, now: DateTime<Utc>) -> ServiceResult<VerificationToken>
where
    R: VerificationRepository + ?Sized,
{
    let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);
    let mut attempt = 1;

    loop {
        let token = random_token();

        match repo.replace_token(user_id, token, expires_at).await {
            Ok(record) => {
                debug!(user_id = %user_id, "Verification token issued");
                return Ok(record);
            }
            Err(e) if e.is_unique_violation(VERIFICATION_TOKEN_KEY) && attempt < MAX_ISSUE_ATTEMPTS => {
                warn!(user_id = %user_id, attempt, "Verification token collision, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Returns the user bound to a live token
///
/// # Errors
///
/// `InvalidOrExpiredToken` when no such token exists or it has expired
pub async fn validate<R>(repo: &R, token: i32, now: DateTime<Utc>) -> ServiceResult<Uuid>
where
    R: VerificationRepository + ?Sized,
{
    repo.find_token(token)
        .await?
        .filter(|record| record.is_valid_at(now))
        .map(|record| record.user_id)
        .ok_or(ServiceError::InvalidOrExpiredToken)
}

/// Validates and deletes a token, returning its user
///
/// If a concurrent consumer deleted the token first, this call fails with
/// `InvalidOrExpiredToken`, so each token succeeds at most once.
pub async fn consume<R>(repo: &R, token: i32, now: DateTime<Utc>) -> ServiceResult<Uuid>
where
    R: VerificationRepository + ?Sized,
{
    let user_id = validate(repo, token, now).await?;

    if !repo.delete_token(token).await? {
        return Err(ServiceError::InvalidOrExpiredToken);
    }

    Ok(user_id)
}
