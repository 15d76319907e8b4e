/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Form login and Google sign-in
/// - `users`: Registration, profile, email verification, password reset
/// - `tasks`: Task CRUD and listing
/// - `attachments`: File upload and download on a task
/// - `reports`: Usage reports

pub mod attachments;
pub mod auth;
pub mod health;
pub mod reports;
pub mod tasks;
pub mod users;
