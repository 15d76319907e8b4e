/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing, temporary passwords
/// - [`jwt`]: HS256 access tokens
/// - [`middleware`]: Bearer-token extraction and caller resolution
/// - [`authorization`]: Ownership, self-service and quota predicates
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::auth::password::{hash_password, verify_password};
/// use taskmate_shared::auth::jwt::{create_access_token, validate_token};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pw1")?;
/// assert!(verify_password("pw1", &hash)?);
///
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let token = create_access_token(Uuid::new_v4(), "a@x.io", Duration::minutes(30), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.user_email, "a@x.io");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
