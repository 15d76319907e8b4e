/// Due-today reminder mail
///
/// One pass loads every task due on the current UTC day, groups the tasks by
/// owner and mails each owner a single list. Delivery failures are logged and
/// skipped; only store errors abort a pass.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use taskmate_shared::mail::{dispatch, templates, Mailer};
use taskmate_shared::models::task::Task;
use taskmate_shared::store::{Store, StoreError, TaskRepository, UserRepository};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one reminder pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderRun {
    /// Owners with at least one task due today
    pub users: usize,

    pub tasks: usize,

    /// Mails the mailer accepted
    pub delivered: usize,
}

/// `[00:00, next 00:00)` of the UTC day containing `now`
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));

    (start, start + chrono::Duration::days(1))
}

pub async fn send_due_today(
    store: &dyn Store,
    mailer: &dyn Mailer,
    now: DateTime<Utc>,
    mail_timeout: Duration,
) -> Result<ReminderRun, StoreError> {
    let (start, end) = day_bounds(now);
    let due = store.tasks_due_between(start, end).await?;

    let mut run = ReminderRun {
        tasks: due.len(),
        ..Default::default()
    };

    let mut by_owner: BTreeMap<Uuid, Vec<Task>> = BTreeMap::new();
    for task in due {
        by_owner.entry(task.user_id).or_default().push(task);
    }
    run.users = by_owner.len();

    for (user_id, tasks) in by_owner {
        let Some(user) = store.find_user(user_id).await? else {
            warn!(user_id = %user_id, "Skipping reminder for missing user");
            continue;
        };

        let email = templates::reminder_email(&user.email, &tasks);
        if dispatch(mailer, email, mail_timeout).await {
            run.delivered += 1;
        }
    }

    info!(
        users = run.users,
        tasks = run.tasks,
        delivered = run.delivered,
        "Reminder pass finished"
    );

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmate_shared::mail::memory::RecordingMailer;
    use taskmate_shared::mail::templates::REMINDER_SUBJECT;
    use taskmate_shared::models::task::CreateTask;
    use taskmate_shared::models::user::CreateUser;
    use taskmate_shared::store::memory::MemoryStore;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    async fn user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: None,
                last_name: None,
                is_verified: true,
                is_oauth: false,
            })
            .await
            .unwrap()
            .id
    }

    async fn task(store: &MemoryStore, owner: Uuid, title: &str, due: Option<&str>) {
        store
            .create_task(
                owner,
                CreateTask {
                    title: title.to_string(),
                    description: None,
                    due_date: due.map(at),
                    is_completed: false,
                    completed_at: None,
                },
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(at("2030-06-15T13:45:00Z"));

        assert_eq!(start, at("2030-06-15T00:00:00Z"));
        assert_eq!(end, at("2030-06-16T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_one_mail_per_owner() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let ada = user(&store, "ada@example.com").await;
        let bob = user(&store, "bob@example.com").await;

        task(&store, ada, "standup", Some("2030-06-15T09:00:00Z")).await;
        task(&store, ada, "review", Some("2030-06-15T17:30:00Z")).await;
        task(&store, bob, "deploy", Some("2030-06-15T23:59:59Z")).await;
        task(&store, bob, "tomorrow", Some("2030-06-16T00:00:00Z")).await;
        task(&store, bob, "someday", None).await;

        let run = send_due_today(&store, &mailer, at("2030-06-15T00:02:00Z"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(
            run,
            ReminderRun {
                users: 2,
                tasks: 3,
                delivered: 2
            }
        );

        let ada_mail = mailer.last_to("ada@example.com").unwrap();
        assert_eq!(ada_mail.subject, REMINDER_SUBJECT);
        assert_eq!(
            ada_mail.body,
            "The following tasks are due today:\n\
             - title: standup due_at: (2030-06-15 09:00:00)\n\
             - title: review due_at: (2030-06-15 17:30:00)\n"
        );

        let bob_mail = mailer.last_to("bob@example.com").unwrap();
        assert!(bob_mail.body.contains("deploy"));
        assert!(!bob_mail.body.contains("tomorrow"));
        assert!(!bob_mail.body.contains("someday"));
    }

    #[tokio::test]
    async fn test_nothing_due_sends_nothing() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let ada = user(&store, "ada@example.com").await;
        task(&store, ada, "later", Some("2030-07-01T09:00:00Z")).await;

        let run = send_due_today(&store, &mailer, at("2030-06-15T00:00:00Z"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(run, ReminderRun::default());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failures_do_not_abort() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::failing();
        let ada = user(&store, "ada@example.com").await;
        let bob = user(&store, "bob@example.com").await;
        task(&store, ada, "a", Some("2030-06-15T09:00:00Z")).await;
        task(&store, bob, "b", Some("2030-06-15T10:00:00Z")).await;

        let run = send_due_today(&store, &mailer, at("2030-06-15T00:01:00Z"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(run.users, 2);
        assert_eq!(run.delivered, 0);
    }
}
