//! # Taskmate Worker Library
//!
//! Background jobs that run beside the API server.
//!
//! ## Modules
//!
//! - `config`: Worker settings (`DATABASE_*`, `REMINDER_*`, `MAIL_*`)
//! - `reminder`: One pass of the due-today reminder mail
//! - `scheduler`: Periodic loop that runs the reminder shortly after midnight UTC
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskmate_shared::mail::memory::RecordingMailer;
//! use taskmate_shared::store::memory::MemoryStore;
//! use taskmate_worker::config::ReminderConfig;
//! use taskmate_worker::scheduler::ReminderScheduler;
//!
//! # async fn example() {
//! let scheduler = ReminderScheduler::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(RecordingMailer::new()),
//!     ReminderConfig::default(),
//!     std::time::Duration::from_secs(10),
//! );
//!
//! let shutdown = scheduler.shutdown_token();
//! tokio::spawn(async move { scheduler.run().await });
//! shutdown.cancel();
//! # }
//! ```

pub mod config;
pub mod reminder;
pub mod scheduler;
