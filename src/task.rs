use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Name stored in the database and in CSV files.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Priority::Low => "!",
            Priority::Medium => "!!",
            Priority::High => "!!!",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Priority::Low => Priority::High,
            Priority::Medium => Priority::Low,
            Priority::High => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidField {
                field: "priority",
                value: s.to_string(),
            })
    }
}

/// Workflow stage; one board column per variant, in this order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    ToDo,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::ToDo,
        Status::InProgress,
        Status::Review,
        Status::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "ToDo",
            Status::InProgress => "InProgress",
            Status::Review => "Review",
            Status::Done => "Done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Status::ToDo => 0,
            Status::InProgress => 1,
            Status::Review => 2,
            Status::Done => 3,
        }
    }

    pub fn next(self) -> Self {
        Status::ALL[(self.index() + 1) % Status::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Status::ALL[(self.index() + Status::ALL.len() - 1) % Status::ALL.len()]
    }

    /// `completed_at` value a row must carry once it has this status.
    pub fn completion_stamp(self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        (self == Status::Done).then(|| truncate_to_minute(now))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .into_iter()
            .find(|st| {
                st.as_str().eq_ignore_ascii_case(wanted) || st.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::InvalidField {
                field: "status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub priority: Priority,
    pub status: Status,
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    /// Text shown on the board for this task.
    pub fn display_label(&self) -> String {
        if self.status == Status::Done {
            if let Some(completed_at) = self.completed_at {
                return format!("{} (Done: {})", self.title, format_timestamp(completed_at));
            }
        }
        match (self.due_date, self.due_time) {
            (Some(date), Some(time)) => format!(
                "{} (Due {} {})",
                self.title,
                format_date(date),
                format_time(time)
            ),
            (Some(date), None) => format!("{} (Due {})", self.title, format_date(date)),
            (None, Some(time)) => format!("{} (Due {})", self.title, format_time(time)),
            (None, None) => self.title.clone(),
        }
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            due_time: self.due_time,
            priority: self.priority,
            status: self.status,
        }
    }

    pub fn record(&self) -> TaskRecord {
        TaskRecord {
            draft: self.draft(),
            completed_at: self.completed_at,
        }
    }
}

/// The user-editable fields of a task, as produced by the add form and the edit dialog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub priority: Priority,
    pub status: Status,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(())
    }
}

/// Every insertable column; what a CSV import row carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub draft: TaskDraft,
    pub completed_at: Option<NaiveDateTime>,
}

pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(truncate_time(at.time()))
}

fn truncate_time(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| Error::InvalidField {
        field: "due date",
        value: s.to_string(),
    })
}

pub fn parse_time(s: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|_| Error::InvalidField {
        field: "due time",
        value: s.to_string(),
    })
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, Error> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map_err(|_| Error::InvalidField {
        field: "completion time",
        value: s.to_string(),
    })
}

/// Treats blank input as "not set".
pub fn parse_optional<T>(
    s: Option<&str>,
    parse: impl Fn(&str) -> Result<T, Error>,
) -> Result<Option<T>, Error> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}
