/// Bearer-token authentication
///
/// Extracts the JWT from `Authorization: Bearer <token>`, validates it and
/// resolves the account it was issued for. The API server wraps
/// [`authenticate`] in an axum middleware that inserts the resulting
/// [`AuthContext`] into request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use taskmate_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.email)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::store::{StoreError, UserRepository};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    pub email: String,
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is well-formed but its account is gone or changed
    #[error("could not validate credentials")]
    UnknownUser,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.trim().is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token.trim())
}

/// Validates the request's bearer token and resolves the caller
///
/// The user is looked up by the `user_email` claim and must still carry the
/// `sub` ID, so tokens issued before an email change are rejected.
pub async fn authenticate<R>(
    users: &R,
    headers: &HeaderMap,
    secret: &str,
) -> Result<AuthContext, AuthError>
where
    R: UserRepository + ?Sized,
{
    let token = bearer_token(headers)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let user = users
        .find_user_by_email(&claims.user_email)
        .await?
        .filter(|u| u.id == claims.sub)
        .ok_or_else(|| {
            debug!(user_id = %claims.sub, "Token refers to a missing or changed account");
            AuthError::UnknownUser
        })?;

    Ok(AuthContext {
        user_id: user.id,
        email: user.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_access_token;
    use crate::models::user::{CreateUser, UpdateUser};
    use crate::store::memory::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn user(store: &MemoryStore, email: &str) -> crate::models::user::User {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: None,
                last_name: None,
                is_verified: true,
                is_oauth: false,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic abc")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_user() {
        let store = MemoryStore::new();
        let u = user(&store, "a@x.io").await;
        let token = create_access_token(u.id, &u.email, Duration::minutes(30), SECRET).unwrap();

        let auth = authenticate(&store, &headers_with(&format!("Bearer {}", token)), SECRET)
            .await
            .unwrap();
        assert_eq!(auth.user_id, u.id);
        assert_eq!(auth.email, "a@x.io");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_token_after_email_change() {
        let store = MemoryStore::new();
        let u = user(&store, "a@x.io").await;
        let token = create_access_token(u.id, &u.email, Duration::minutes(30), SECRET).unwrap();

        store
            .update_user(
                u.id,
                UpdateUser {
                    email: Some("b@x.io".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result =
            authenticate(&store, &headers_with(&format!("Bearer {}", token)), SECRET).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_mismatched_subject() {
        let store = MemoryStore::new();
        let u = user(&store, "a@x.io").await;
        let token =
            create_access_token(Uuid::new_v4(), &u.email, Duration::minutes(30), SECRET).unwrap();

        let result =
            authenticate(&store, &headers_with(&format!("Bearer {}", token)), SECRET).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }
}
