//! # Taskmate Shared Library
//!
//! Domain logic shared by the Taskmate API server and the reminder worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `store`: Repository traits with PostgreSQL and in-memory backends
//! - `auth`: Password hashing, JWTs, bearer authentication, ownership checks
//! - `verification`: One-time email/password-reset tokens
//! - `account`: Registration, login, OAuth, profile and password reset
//! - `tasks`: Task and attachment operations, per-user task cap
//! - `reports`: Usage reports over a user's tasks
//! - `mail`: Outgoing email (SMTP and recording mailers, message templates)
//! - `config`: Mail and account settings
//! - `error`: Domain error taxonomy

pub mod account;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod quota;
pub mod reports;
pub mod store;
pub mod tasks;
pub mod verification;

/// Current version of the Taskmate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
