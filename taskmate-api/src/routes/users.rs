/// User endpoints
///
/// - `POST /users` - Register (201)
/// - `PUT|PATCH /users/:id` - Update own profile (202, bearer)
/// - `GET /users/verify-email?token=` - Verify email (200)
/// - `GET /users/:id/reset-password-request` - Mail a reset link (201, bearer)
/// - `GET /users/:id/reset-password?token=` - Get a temporary password (202)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskmate_shared::{
    account::{NewAccount, ProfileChanges},
    auth::middleware::AuthContext,
    verification::parse_token,
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub last_name: Option<String>,
}

/// Profile update request; absent fields stay unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenParams {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Registers a new, unverified account and mails a verification link
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = state
        .accounts()
        .register(NewAccount {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = state
        .accounts()
        .update_profile(
            &auth,
            id,
            ProfileChanges {
                email: req.email,
                password: req.password,
                first_name: req.first_name,
                last_name: req.last_name,
            },
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(user)))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> ApiResult<impl IntoResponse> {
    let token = parse_token(&params.token)?;

    state.accounts().verify_email(token).await?;

    Ok((StatusCode::OK, MessageResponse::new("email verified")))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.accounts().request_password_reset(&auth, id).await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("check your email to proceed further"),
    ))
}

/// Consumes a reset token and returns a temporary password in the body
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<TokenParams>,
) -> ApiResult<impl IntoResponse> {
    let token = parse_token(&params.token)?;

    let temporary = state.accounts().reset_password(id, token).await?;

    Ok((
        StatusCode::ACCEPTED,
        MessageResponse::new(format!(
            "password successfully reset, use this temporary password to login and change your password: {}",
            temporary
        )),
    ))
}
