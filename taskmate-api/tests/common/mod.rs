//! Common test utilities for router tests
//!
//! The router runs against `MemoryStore` and `RecordingMailer`, so these
//! tests need no database or SMTP server:
//! - Request helpers that return status and JSON body
//! - Account helpers (register, verify, log in)
//! - A fake Google identity provider

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskmate_api::app::{build_router, AppState};
use taskmate_api::config::Config;
use taskmate_api::oauth::{IdentityProvider, OAuthError};
use taskmate_shared::account::OAuthIdentity;
use taskmate_shared::config::MailConfig;
use taskmate_shared::mail::memory::RecordingMailer;
use taskmate_shared::store::memory::MemoryStore;
use tower::Service as _;

pub const JWT_SECRET: &str = "router-test-secret-that-is-long-enough";
pub const PASSWORD: &str = "correct-horse-battery";

/// Identity provider that returns whatever identity the test set
#[derive(Default)]
pub struct FakeIdentity {
    pub identity: Mutex<Option<OAuthIdentity>>,
}

impl FakeIdentity {
    pub fn set(&self, email: &str) {
        if let Ok(mut slot) = self.identity.lock() {
            *slot = Some(OAuthIdentity {
                email: email.to_string(),
                first_name: Some("Grace".to_string()),
                last_name: Some("Hopper".to_string()),
            });
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.example.test/auth?state={}", state)
    }

    async fn identify(&self, code: &str) -> Result<OAuthIdentity, OAuthError> {
        if code == "bad-code" {
            return Err(OAuthError::Exchange("invalid_grant".to_string()));
        }

        self.identity
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(OAuthError::UnverifiedEmail)
    }
}

/// Test context containing the router and handles to its collaborators
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub identity: Arc<FakeIdentity>,
}

/// Logged-in account
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("DATABASE_URL".into(), "postgresql://unused/taskmate".into());
    vars.insert("JWT_SECRET".into(), JWT_SECRET.into());
    vars.insert("BASE_URL".into(), "http://taskmate.test".into());
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned(), MailConfig::default())
        .expect("test config is valid")
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]), true)
    }

    /// `with_oauth = false` leaves Google sign-in unconfigured
    pub fn with_config(config: Config, with_oauth: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let identity = Arc::new(FakeIdentity::default());

        let provider: Option<Arc<dyn IdentityProvider>> = if with_oauth {
            Some(identity.clone() as Arc<dyn IdentityProvider>)
        } else {
            None
        };

        let state = AppState::new(store.clone(), mailer.clone(), provider, config);

        Self {
            app: build_router(state),
            store,
            mailer,
            identity,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(bearer) = bearer {
            builder = builder.header(header::AUTHORIZATION, bearer);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        read_json(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let form = format!("username={}&password={}", encode(email), encode(password));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();

        read_json(self.send(request).await).await
    }

    pub async fn register(&self, email: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/users",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": PASSWORD,
                "first_name": "Ada",
            })),
        )
        .await
    }

    /// Token from the newest mail sent to `to`
    pub fn mailed_token(&self, to: &str) -> String {
        let email = self.mailer.last_to(to).expect("a mail was sent");
        token_from_body(&email.body)
    }

    /// Registers, verifies through the mailed link and logs in
    pub async fn verified_user(&self, email: &str) -> TestUser {
        let (status, body) = self.register(email).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let token = self.mailed_token(email);
        let (status, _) = self
            .request(Method::GET, &format!("/users/verify-email?token={}", token), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, login) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::ACCEPTED, "login failed: {}", login);

        TestUser {
            id: body["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: login["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a task through the API and returns its JSON
    pub async fn create_task(&self, user: &TestUser, body: Value) -> Value {
        let (status, task) = self
            .request(Method::POST, "/tasks", Some(&user.bearer()), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", task);
        task
    }
}

pub async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = read_body(response).await;

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}

/// Extracts the 6-digit value following `token=` in a mail body
pub fn token_from_body(body: &str) -> String {
    let start = body.find("token=").expect("mail contains a token") + "token=".len();
    body[start..].chars().take_while(|c| c.is_ascii_digit()).collect()
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
