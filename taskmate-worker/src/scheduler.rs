/// Reminder scheduler
///
/// Wakes every `interval` (the first wake-up is one interval after start)
/// until shut down. A wake-up whose UTC time of day falls within
/// `[00:00, 00:00 + window]` runs one reminder pass. With the default five
/// minute interval and window, roughly one pass happens per day; nothing
/// records which days were already reminded.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmate_shared::mail::memory::RecordingMailer;
/// use taskmate_shared::store::memory::MemoryStore;
/// use taskmate_worker::config::ReminderConfig;
/// use taskmate_worker::scheduler::ReminderScheduler;
///
/// # async fn example() {
/// let scheduler = ReminderScheduler::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(RecordingMailer::new()),
///     ReminderConfig::default(),
///     std::time::Duration::from_secs(10),
/// );
///
/// let token = scheduler.shutdown_token();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     token.cancel();
/// });
///
/// scheduler.run().await;
/// # }
/// ```

use crate::config::ReminderConfig;
use crate::reminder::{send_due_today, ReminderRun};
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use taskmate_shared::mail::Mailer;
use taskmate_shared::store::Store;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ReminderScheduler {
    store: Arc<dyn Store>,

    mailer: Arc<dyn Mailer>,

    config: ReminderConfig,

    /// Upper bound for each reminder mail
    mail_timeout: Duration,

    clock: Clock,

    shutdown_token: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        config: ReminderConfig,
        mail_timeout: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
            mail_timeout,
            clock: Arc::new(Utc::now),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Replaces the wall clock used to decide whether a wake-up is in the window
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Cancel the returned token to stop [`run`](Self::run)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// True when `now` is at most `window` past midnight UTC
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let since_midnight = now.time() - NaiveTime::MIN;

        since_midnight <= self.config.window()
    }

    /// Runs a reminder pass if `now` is in the window
    ///
    /// Returns `None` outside the window or when the pass failed.
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<ReminderRun> {
        if !self.in_window(now) {
            tracing::trace!(now = %now, "Outside reminder window");
            return None;
        }

        match send_due_today(self.store.as_ref(), self.mailer.as_ref(), now, self.mail_timeout).await {
            Ok(run) => Some(run),
            Err(e) => {
                tracing::error!(error = %e, "Reminder pass failed");
                None
            }
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            window_minutes = self.config.window_minutes,
            "Reminder scheduler starting"
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    break;
                }
                _ = sleep(self.config.interval()) => {
                    let now = (self.clock)();
                    self.tick(now).await;
                }
            }
        }

        tracing::info!("Reminder scheduler stopped");
    }
}
