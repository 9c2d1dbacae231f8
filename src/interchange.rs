//! CSV export and import of the task table.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::{
    format_date, format_time, format_timestamp, parse_date, parse_optional, parse_time,
    parse_timestamp, Task, TaskDraft, TaskRecord,
};

pub const HEADER: [&str; 8] = [
    "ID",
    "Task",
    "Description",
    "DueDate",
    "DueTime",
    "Priority",
    "Status",
    "CompletedAt",
];

/// Columns an import cannot do without. `ID` is ignored and `CompletedAt` may be absent.
const REQUIRED: [&str; 6] = ["Task", "Description", "DueDate", "DueTime", "Priority", "Status"];

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Task")]
    title: &'a str,
    #[serde(rename = "Description")]
    description: Option<&'a str>,
    #[serde(rename = "DueDate")]
    due_date: Option<String>,
    #[serde(rename = "DueTime")]
    due_time: Option<String>,
    #[serde(rename = "Priority")]
    priority: &'static str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "CompletedAt")]
    completed_at: Option<String>,
}

impl<'a> From<&'a Task> for ExportRow<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id,
            title: &task.title,
            description: task.description.as_deref(),
            due_date: task.due_date.map(format_date),
            due_time: task.due_time.map(format_time),
            priority: task.priority.as_str(),
            status: task.status.as_str(),
            completed_at: task.completed_at.map(format_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(rename = "Task")]
    title: String,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "DueDate")]
    due_date: Option<String>,
    #[serde(rename = "DueTime")]
    due_time: Option<String>,
    #[serde(rename = "Priority")]
    priority: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "CompletedAt", default)]
    completed_at: Option<String>,
}

impl TryFrom<ImportRow> for TaskRecord {
    type Error = Error;

    fn try_from(row: ImportRow) -> Result<Self> {
        Ok(Self {
            draft: TaskDraft {
                title: row.title,
                description: row.description.filter(|d| !d.is_empty()),
                due_date: parse_optional(row.due_date.as_deref(), parse_date)?,
                due_time: parse_optional(row.due_time.as_deref(), parse_time)?,
                priority: row.priority.parse()?,
                status: row.status.parse()?,
            },
            completed_at: parse_optional(row.completed_at.as_deref(), parse_timestamp)?,
        })
    }
}

pub fn write_tasks<W: Write>(writer: W, tasks: &[Task]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if tasks.is_empty() {
        writer.write_record(HEADER)?;
    }
    for task in tasks {
        writer.serialize(ExportRow::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses every row before returning, so a bad row rejects the whole file.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<TaskRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    if let Some(missing) = REQUIRED
        .into_iter()
        .find(|name| !headers.iter().any(|h| h == *name))
    {
        return Err(Error::MissingColumn(missing));
    }
    reader
        .deserialize::<ImportRow>()
        .map(|row| TaskRecord::try_from(row?))
        .collect()
}

pub fn export(store: &TaskStore, path: &Path) -> Result<usize> {
    let tasks = store.all()?;
    let file = std::fs::File::create(path)?;
    write_tasks(file, &tasks)?;
    info!(count = tasks.len(), path = %path.display(), "exported tasks");
    Ok(tasks.len())
}

pub fn import(store: &TaskStore, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)?;
    let records = read_records(file)?;
    let count = store.insert_records(&records)?;
    info!(count, path = %path.display(), "imported tasks");
    Ok(count)
}
