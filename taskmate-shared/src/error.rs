/// Domain error taxonomy
///
/// Every service operation returns [`ServiceResult`]. The API crate maps
/// each variant onto exactly one HTTP status; the messages here are the
/// ones clients see.

use thiserror::Error;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::mail::MailError;
use crate::store::{StoreError, USERS_EMAIL_KEY};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// 409
    #[error("user with email: {0} already exists")]
    DuplicateEmail(String),

    /// 409
    #[error("the new email address cannot be the same as the current email address")]
    EmailUnchanged,

    /// 403
    #[error("invalid credentials")]
    InvalidCredentials,

    /// 412; the payload names the attempted action
    #[error("kindly verify your email before trying to {0}")]
    UnverifiedAccount(&'static str),

    /// 401
    #[error("not authorized to perform action")]
    Unauthorized,

    /// 403
    #[error("not authorized to perform action")]
    Forbidden,

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 401
    #[error("invalid or expired verification token")]
    InvalidOrExpiredToken,

    /// 403
    #[error("max number of tasks reached")]
    MaxResourceLimitReached { limit: u32 },

    /// 403
    #[error("change your google account password instead")]
    OAuthAccountForbidden,

    /// 422
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Account flows send mail through `mail::dispatch` and never return
    /// this; it is for callers of `mail::deliver` that need the outcome.
    #[error("mail delivery failure: {0}")]
    MailDelivery(#[from] MailError),

    #[error("password hashing failure: {0}")]
    Password(#[from] PasswordError),

    #[error("token signing failure: {0}")]
    Token(#[from] JwtError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Converts a store error, turning an email unique violation into
    /// [`ServiceError::DuplicateEmail`]
    pub fn from_user_write(err: StoreError, email: &str) -> Self {
        if err.is_unique_violation(USERS_EMAIL_KEY) {
            ServiceError::DuplicateEmail(email.to_string())
        } else {
            ServiceError::Persistence(err)
        }
    }

    /// True for failures caused by infrastructure rather than the request
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ServiceError::Persistence(_)
                | ServiceError::MailDelivery(_)
                | ServiceError::Password(_)
                | ServiceError::Token(_)
        )
    }
}
