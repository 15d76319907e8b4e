/// Message bodies for account and reminder mail

use uuid::Uuid;

use super::Email;
use crate::models::task::Task;

pub const VERIFICATION_SUBJECT: &str = "Verify your email";
pub const PASSWORD_RESET_SUBJECT: &str = "Reset your password";
pub const REMINDER_SUBJECT: &str = "Tasks Reminder";

pub fn verification_link(base_url: &str, token: i32) -> String {
    format!(
        "{}/users/verify-email?token={}",
        base_url.trim_end_matches('/'),
        token
    )
}

pub fn password_reset_link(base_url: &str, user_id: Uuid, token: i32) -> String {
    format!(
        "{}/users/{}/reset-password?token={}",
        base_url.trim_end_matches('/'),
        user_id,
        token
    )
}

pub fn verification_email(to: &str, base_url: &str, token: i32) -> Email {
    Email {
        to: to.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        body: format!(
            "Welcome to Taskmate!\n\n\
             Open the link below to verify your email address:\n\
             {}\n\n\
             The link expires in 24 hours.\n",
            verification_link(base_url, token)
        ),
    }
}

pub fn password_reset_email(to: &str, base_url: &str, user_id: Uuid, token: i32) -> Email {
    Email {
        to: to.to_string(),
        subject: PASSWORD_RESET_SUBJECT.to_string(),
        body: format!(
            "A password reset was requested for your Taskmate account.\n\n\
             Open the link below to receive a temporary password:\n\
             {}\n\n\
             If you did not request this, you can ignore this email.\n",
            password_reset_link(base_url, user_id, token)
        ),
    }
}

/// One line per task, in the order given
pub fn reminder_email(to: &str, tasks: &[Task]) -> Email {
    let mut body = String::from("The following tasks are due today:\n");

    for task in tasks {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        body.push_str(&format!("- title: {} due_at: ({})\n", task.title, due));
    }

    Email {
        to: to.to_string(),
        subject: REMINDER_SUBJECT.to_string(),
        body,
    }
}
