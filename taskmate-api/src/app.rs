/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmate_api::{app::AppState, config::Config};
/// use taskmate_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskmate_shared::mail::smtp::SmtpMailer;
/// use taskmate_shared::store::postgres::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let mailer = SmtpMailer::new(&config.mail)?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(mailer), None, config);
/// let app = taskmate_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, oauth::IdentityProvider};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskmate_shared::{
    account::Accounts,
    auth::middleware::authenticate,
    config::AccountSettings,
    mail::Mailer,
    store::Store,
    tasks::Tasks,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub mailer: Arc<dyn Mailer>,

    /// `None` when Google sign-in is not configured
    pub identity: Option<Arc<dyn IdentityProvider>>,

    pub config: Arc<Config>,

    pub settings: Arc<AccountSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        identity: Option<Arc<dyn IdentityProvider>>,
        config: Config,
    ) -> Self {
        let settings = Arc::new(config.account_settings());

        Self {
            store,
            mailer,
            identity,
            config: Arc::new(config),
            settings,
        }
    }

    pub fn accounts(&self) -> Accounts<'_> {
        Accounts::new(self.store.as_ref(), self.mailer.as_ref(), &self.settings)
    }

    pub fn tasks(&self) -> Tasks<'_> {
        Tasks::new(self.store.as_ref(), self.settings.max_tasks)
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// ├── POST /login                         form login
/// ├── GET  /login/oauth                   redirect to Google
/// ├── GET  /login/google/callback
/// ├── /users
/// │   ├── POST /                             (also /users/)
/// │   ├── GET  /verify-email?token=
/// │   ├── GET  /:id/reset-password?token=
/// │   ├── PUT|PATCH /:id                     (bearer)
/// │   └── GET  /:id/reset-password-request   (bearer)
/// ├── /tasks                                 (bearer)
/// │   ├── POST / , GET /?search=&sort=       (also /tasks/)
/// │   ├── GET|PUT|PATCH|DELETE /:id
/// │   ├── POST /:id/file
/// │   └── GET  /:id/file/:file_id
/// └── /reports/{count,average,overdue,max,day}  (bearer)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/login", post(routes::auth::login))
        .route("/login/oauth", get(routes::auth::oauth_redirect))
        .route("/login/google/callback", get(routes::auth::oauth_callback))
        .route("/users", post(routes::users::register))
        .route("/users/", post(routes::users::register))
        .route("/users/verify-email", get(routes::users::verify_email))
        .route("/users/:id/reset-password", get(routes::users::reset_password));

    let protected_routes = Router::new()
        .route(
            "/users/:id",
            axum::routing::put(routes::users::update_user).patch(routes::users::update_user),
        )
        .route(
            "/users/:id/reset-password-request",
            get(routes::users::request_password_reset),
        )
        .route(
            "/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/file", post(routes::attachments::upload_file))
        .route(
            "/tasks/:id/file/:file_id",
            get(routes::attachments::download_file),
        )
        .route("/reports/count", get(routes::reports::count))
        .route("/reports/average", get(routes::reports::average))
        .route("/reports/overdue", get(routes::reports::overdue))
        .route("/reports/max", get(routes::reports::max))
        .route("/reports/day", get(routes::reports::day))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let body_limit = state.config.api.max_upload_bytes;

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Resolves the bearer token to a live account, then injects
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(state.store.as_ref(), req.headers(), state.jwt_secret()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
