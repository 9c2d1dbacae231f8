use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: i64,
    pub title: String,
    pub seconds_left: i64,
}

impl Reminder {
    pub fn message(&self) -> String {
        let minutes = (self.seconds_left + 59) / 60;
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        format!("Task \"{}\" is due in {minutes} {unit}.", self.title)
    }
}

/// Tasks due today whose due time is more than zero and at most `window` ahead of `now`.
///
/// Nothing remembers earlier hits, so a task keeps firing on every scan while it
/// stays inside the window.
pub fn due_soon(tasks: &[Task], now: NaiveDateTime, window: Duration) -> Vec<Reminder> {
    let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
    tasks
        .iter()
        .filter_map(|task| {
            let (date, time) = (task.due_date?, task.due_time?);
            if date != now.date() {
                return None;
            }
            let seconds_left = time.signed_duration_since(now.time()).num_seconds();
            (seconds_left > 0 && seconds_left <= window).then(|| Reminder {
                task_id: task.id,
                title: task.title.clone(),
                seconds_left,
            })
        })
        .collect()
}

/// One scan against the store.
pub fn scan(store: &TaskStore, now: NaiveDateTime, window: Duration) -> Result<Vec<Reminder>> {
    let candidates = store.reminder_candidates()?;
    let reminders = due_soon(&candidates, now, window);
    for reminder in &reminders {
        tracing::info!(
            task_id = reminder.task_id,
            seconds_left = reminder.seconds_left,
            "reminder due"
        );
    }
    Ok(reminders)
}

/// Fixed-interval tick driven from the event loop's poll timeout.
#[derive(Debug, Clone)]
pub struct ReminderTimer {
    interval: Duration,
    next: Instant,
}

impl ReminderTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    pub fn time_left(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Returns true once per elapsed interval and schedules the next tick.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            self.next += self.interval;
        }
        true
    }
}
