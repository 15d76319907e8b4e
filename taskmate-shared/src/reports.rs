/// Usage reports over a user's tasks
///
/// All functions are pure: callers load the task list once and pass `now`
/// explicitly. Calendar buckets are UTC days.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub incomplete_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageReport {
    pub average_tasks_completed_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueTask {
    pub id: Uuid,
    pub title: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueReport {
    pub overdue_tasks: usize,
    pub tasks: Vec<OverdueTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaxReport {
    pub date: NaiveDate,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub created_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    pub days: Vec<DayCount>,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn count(tasks: &[Task]) -> CountReport {
    let completed = tasks.iter().filter(|t| t.is_completed).count();

    CountReport {
        total_tasks: tasks.len(),
        completed_tasks: completed,
        incomplete_tasks: tasks.len() - completed,
    }
}

/// Completed tasks per whole day since `member_since`, at least one day
pub fn average(tasks: &[Task], member_since: DateTime<Utc>, now: DateTime<Utc>) -> AverageReport {
    let completed = tasks.iter().filter(|t| t.is_completed).count() as f64;
    let days = (now - member_since).num_days().max(1) as f64;

    AverageReport {
        average_tasks_completed_per_day: completed / days,
    }
}

/// Incomplete tasks whose due date has passed, earliest first
pub fn overdue(tasks: &[Task], now: DateTime<Utc>) -> OverdueReport {
    let mut late: Vec<OverdueTask> = tasks
        .iter()
        .filter(|t| !t.is_completed)
        .filter_map(|t| {
            t.due_date.filter(|due| *due < now).map(|due| OverdueTask {
                id: t.id,
                title: t.title.clone(),
                due_date: due,
            })
        })
        .collect();

    late.sort_by_key(|t| t.due_date);

    OverdueReport {
        overdue_tasks: late.len(),
        tasks: late,
    }
}

/// Day with the most completions; `None` when nothing is completed
pub fn max(tasks: &[Task]) -> Option<MaxReport> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for completed_at in tasks.iter().filter(|t| t.is_completed).filter_map(|t| t.completed_at) {
        *per_day.entry(completed_at.date_naive()).or_default() += 1;
    }

    // BTreeMap iterates in date order, so the strict comparison keeps the earliest tie
    per_day
        .into_iter()
        .fold(None, |best: Option<MaxReport>, (date, n)| match best {
            Some(b) if b.completed_tasks >= n => Some(b),
            _ => Some(MaxReport {
                date,
                completed_tasks: n,
            }),
        })
}

/// Created and completed counts per weekday, Monday first
pub fn day(tasks: &[Task]) -> DayReport {
    let mut created = [0usize; 7];
    let mut completed = [0usize; 7];

    for task in tasks {
        created[task.created_at.weekday().num_days_from_monday() as usize] += 1;

        if let Some(at) = task.completed_at.filter(|_| task.is_completed) {
            completed[at.weekday().num_days_from_monday() as usize] += 1;
        }
    }

    DayReport {
        days: WEEK
            .iter()
            .enumerate()
            .map(|(i, d)| DayCount {
                day: day_name(*d).to_string(),
                created_tasks: created[i],
                completed_tasks: completed[i],
            })
            .collect(),
    }
}
