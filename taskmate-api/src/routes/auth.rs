/// Authentication endpoints
///
/// - `POST /login` - Form login (`username`, `password`), returns a bearer token
/// - `GET /login/oauth` - Redirect to Google sign-in
/// - `GET /login/google/callback` - Google redirect target

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    oauth::{generate_state, state_cookie, state_from_cookie_header, STATE_COOKIE},
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use taskmate_shared::account::OAuthOutcome;

/// Login form, OAuth2 password-flow field names
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Email address
    pub username: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,

    pub state: Option<String>,

    /// Set by Google when the user denied consent
    pub error: Option<String>,
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/x-www-form-urlencoded
///
/// username=user@example.com&password=...
/// ```
///
/// # Response (202)
///
/// ```json
/// { "access_token": "eyJ...", "token_type": "bearer" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Unknown email or wrong password
/// - `412 Precondition Failed`: Email not verified (a new link is mailed)
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<impl IntoResponse> {
    let token = state.accounts().login(&form.username, &form.password).await?;

    Ok((StatusCode::ACCEPTED, Json(token)))
}

/// Starts Google sign-in
///
/// # Errors
///
/// - `503 Service Unavailable`: Google credentials not configured
pub async fn oauth_redirect(State(state): State<AppState>) -> ApiResult<Response> {
    let provider = state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("google sign-in is not configured".to_string()))?;

    let oauth_state = generate_state();
    let url = provider.authorization_url(&oauth_state);

    Ok((
        [(header::SET_COOKIE, state_cookie(&oauth_state))],
        Redirect::to(&url),
    )
        .into_response())
}

/// Completes Google sign-in
///
/// An existing Google account gets a bearer token; a first sign-in creates
/// the account and asks the client to log in again.
///
/// # Errors
///
/// - `400 Bad Request`: Missing code, or state does not match the cookie
/// - `401 Unauthorized`: Google reports the email as unverified
/// - `409 Conflict`: A password account already uses the email
/// - `502 Bad Gateway`: Google could not be reached
pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let provider = state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("google sign-in is not configured".to_string()))?;

    if let Some(error) = params.error {
        return Err(ApiError::BadRequest(format!("google sign-in failed: {}", error)));
    }

    let expected = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(state_from_cookie_header);

    match (expected, params.state.as_deref()) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => return Err(ApiError::BadRequest("invalid oauth state".to_string())),
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".to_string()))?;

    let identity = provider.identify(&code).await?;

    let clear_cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/login; Max-Age=0", STATE_COOKIE);

    let body = match state.accounts().oauth_login(identity).await? {
        OAuthOutcome::LoggedIn(token) => Json(json!(token)),
        OAuthOutcome::Registered(_) => Json(json!({ "message": "login again to get access token" })),
    };

    Ok((StatusCode::ACCEPTED, [(header::SET_COOKIE, clear_cookie)], body).into_response())
}
