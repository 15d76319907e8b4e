//! # Taskmate API Server Library
//!
//! This library provides the HTTP surface of Taskmate.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `oauth`: Google sign-in client
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod oauth;
pub mod routes;
