use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::error::{Error, Result};
use crate::task::{
    format_date, format_time, format_timestamp, parse_date, parse_optional, parse_time,
    parse_timestamp, Priority, Status, Task, TaskDraft, TaskRecord,
};

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        due_date TEXT,
        due_time TEXT,
        priority TEXT,
        status TEXT,
        completed_at TEXT
    )";

const COLUMNS: &str = "id, title, description, due_date, due_time, priority, status, completed_at";

const INSERT: &str = "
    INSERT INTO tasks (title, description, due_date, due_time, priority, status, completed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// Text and priority predicates applied when loading the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub text: String,
    pub priority: Option<Priority>,
}

impl TaskFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }
}

/// Accessor for the `tasks` table. Every call opens its own connection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Binds the store to `path` and creates the table if it is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.connect()?.execute_batch(CREATE_TABLE)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|source| Error::Connection {
            path: self.path.clone(),
            source,
        })
    }

    /// Rows matching `filter`, ordered by due date then due time. Unset dates sort first.
    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        debug!(text = %filter.text, priority = ?filter.priority, "loading tasks");
        let conn = self.connect()?;
        let pattern = format!("%{}%", escape_like(filter.text.trim()));
        let sql = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE (title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR priority = ?2)
             ORDER BY due_date, due_time, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, filter.priority], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every row in insertion order.
    pub fn all(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM tasks ORDER BY id"))?;
        let rows = stmt.query_map([], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.connect()?;
        let task = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Inserts a new row, stamping `completed_at` when the draft starts out as done.
    pub fn insert(&self, draft: &TaskDraft, now: NaiveDateTime) -> Result<i64> {
        draft.validate()?;
        let conn = self.connect()?;
        insert_row(&conn, draft, draft.status.completion_stamp(now))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, id: i64, draft: &TaskDraft, now: NaiveDateTime) -> Result<()> {
        draft.validate()?;
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, due_date = ?3, due_time = ?4,
                 priority = ?5, status = ?6, completed_at = ?7
             WHERE id = ?8",
            params![
                draft.title.trim(),
                draft.description,
                draft.due_date.map(format_date),
                draft.due_time.map(format_time),
                draft.priority,
                draft.status,
                draft.status.completion_stamp(now).map(format_timestamp),
                id,
            ],
        )?;
        expect_changed(changed, id)
    }

    pub fn set_status(&self, id: i64, status: Status, now: NaiveDateTime) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE tasks SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![
                status,
                status.completion_stamp(now).map(format_timestamp),
                id
            ],
        )?;
        expect_changed(changed, id)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        expect_changed(changed, id)
    }

    /// Bulk insert in one transaction. Records are taken as-is; no duplicate detection.
    pub fn insert_records(&self, records: &[TaskRecord]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT)?;
            for record in records {
                let draft = &record.draft;
                stmt.execute(params![
                    draft.title,
                    draft.description,
                    draft.due_date.map(format_date),
                    draft.due_time.map(format_time),
                    draft.priority,
                    draft.status,
                    record.completed_at.map(format_timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Unfinished tasks that have both a due date and a due time.
    pub fn reminder_candidates(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE status != ?1 AND due_date IS NOT NULL AND due_time IS NOT NULL"
        ))?;
        let rows = stmt.query_map(params![Status::Done], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn insert_row(
    conn: &Connection,
    draft: &TaskDraft,
    completed_at: Option<NaiveDateTime>,
) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT,
        params![
            draft.title.trim(),
            draft.description,
            draft.due_date.map(format_date),
            draft.due_time.map(format_time),
            draft.priority,
            draft.status,
            completed_at.map(format_timestamp),
        ],
    )
}

fn expect_changed(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: text_column(row, 3, parse_date)?,
        due_time: text_column(row, 4, parse_time)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        completed_at: text_column(row, 7, parse_timestamp)?,
    })
}

fn text_column<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Result<T>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    parse_optional(raw.as_deref(), parse)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: Error| FromSqlError::Other(Box::new(err)))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: Error| FromSqlError::Other(Box::new(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        (dir, store)
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 7, 33)
            .unwrap()
    }

    fn draft(title: &str, priority: Priority) -> TaskDraft {
        TaskDraft {
            priority,
            ..TaskDraft::new(title)
        }
    }

    fn assert_completion_invariant(store: &TaskStore) {
        for task in store.all().unwrap() {
            assert_eq!(
                task.completed_at.is_some(),
                task.status == Status::Done,
                "completed_at out of sync for {task:?}"
            );
        }
    }

    #[test]
    fn open_is_idempotent() {
        let (dir, store) = create_test_store();
        store.insert(&TaskDraft::new("keep me"), now()).unwrap();
        let reopened = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        assert_eq!(reopened.all().unwrap().len(), 1);
    }

    #[test]
    fn open_reports_connection_failure() {
        let dir = TempDir::new().unwrap();
        let err = TaskStore::open(dir.path().join("missing").join("tasks.db")).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (_dir, store) = create_test_store();
        let draft = TaskDraft {
            title: "Pay rent".into(),
            description: Some("Transfer before noon".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 1),
            due_time: NaiveTime::from_hms_opt(11, 30, 0),
            priority: Priority::High,
            status: Status::InProgress,
        };
        let id = store.insert(&draft, now()).unwrap();

        let task = store.get(id).unwrap().unwrap();
        assert_eq!(task.draft(), draft);
        assert_eq!(task.completed_at, None);
        assert_eq!(store.get(id + 100).unwrap(), None);
    }

    #[test]
    fn insert_rejects_empty_title() {
        let (_dir, store) = create_test_store();
        let err = store.insert(&TaskDraft::new("  "), now()).unwrap_err();
        assert!(matches!(err, Error::EmptyTitle));
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn insert_done_stamps_completion() {
        let (_dir, store) = create_test_store();
        let id = store
            .insert(
                &TaskDraft {
                    status: Status::Done,
                    ..TaskDraft::new("Already finished")
                },
                now(),
            )
            .unwrap();
        let task = store.get(id).unwrap().unwrap();
        assert_eq!(
            task.completed_at,
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(14, 7, 0)
        );
        assert_completion_invariant(&store);
    }

    #[test]
    fn status_drop_sets_and_clears_completion() {
        let (_dir, store) = create_test_store();
        let id = store.insert(&TaskDraft::new("Ship it"), now()).unwrap();

        store.set_status(id, Status::Done, now()).unwrap();
        let done = store.get(id).unwrap().unwrap();
        assert_eq!(done.status, Status::Done);
        assert!(done.completed_at.is_some());
        assert_completion_invariant(&store);

        store.set_status(id, Status::ToDo, now()).unwrap();
        let back = store.get(id).unwrap().unwrap();
        assert_eq!(back.status, Status::ToDo);
        assert_eq!(back.completed_at, None);
        assert_completion_invariant(&store);
    }

    #[test]
    fn update_applies_completion_rule() {
        let (_dir, store) = create_test_store();
        let id = store.insert(&TaskDraft::new("Draft"), now()).unwrap();

        let mut edited = TaskDraft {
            status: Status::Done,
            description: Some("final".into()),
            ..TaskDraft::new("Final")
        };
        store.update(id, &edited, now()).unwrap();
        let task = store.get(id).unwrap().unwrap();
        assert_eq!(task.title, "Final");
        assert!(task.completed_at.is_some());

        edited.status = Status::Review;
        store.update(id, &edited, now()).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().completed_at, None);
        assert_completion_invariant(&store);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let (_dir, store) = create_test_store();
        let err = store.update(42, &TaskDraft::new("ghost"), now()).unwrap_err();
        assert!(matches!(err, Error::NotFound(42)));
        let err = store.set_status(42, Status::Done, now()).unwrap_err();
        assert!(matches!(err, Error::NotFound(42)));
    }

    #[test]
    fn delete_missing_row_leaves_table_unchanged() {
        let (_dir, store) = create_test_store();
        let id = store.insert(&TaskDraft::new("stay"), now()).unwrap();
        let before = store.all().unwrap();

        let err = store.delete(id + 1).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.all().unwrap(), before);

        store.delete(id).unwrap();
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn priority_filter_ignores_text_match_on_other_priorities() {
        let (_dir, store) = create_test_store();
        store.insert(&draft("report high", Priority::High), now()).unwrap();
        store.insert(&draft("report low", Priority::Low), now()).unwrap();
        store.insert(&draft("other high", Priority::High), now()).unwrap();

        for text in ["", "report", "zzz"] {
            let filter = TaskFilter::text(text).with_priority(Some(Priority::High));
            let tasks = store.list(&filter).unwrap();
            assert!(tasks.iter().all(|t| t.priority == Priority::High), "{text}");
        }
        let filter = TaskFilter::text("report").with_priority(Some(Priority::High));
        assert_eq!(store.list(&filter).unwrap().len(), 1);
        assert_eq!(store.list(&TaskFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn search_matches_description_only_text() {
        let (_dir, store) = create_test_store();
        let id = store
            .insert(
                &TaskDraft {
                    description: Some("remember the oat milk".into()),
                    ..TaskDraft::new("Groceries")
                },
                now(),
            )
            .unwrap();
        store.insert(&TaskDraft::new("Laundry"), now()).unwrap();

        let found = store.list(&TaskFilter::text("oat milk")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let (_dir, store) = create_test_store();
        store.insert(&TaskDraft::new("50% off"), now()).unwrap();
        store.insert(&TaskDraft::new("500 boxes"), now()).unwrap();

        let found = store.list(&TaskFilter::text("0%")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "50% off");
    }

    #[test]
    fn list_orders_by_due_date_then_time() {
        let (_dir, store) = create_test_store();
        let day = |d| NaiveDate::from_ymd_opt(2026, 10, d);
        let time = |h| NaiveTime::from_hms_opt(h, 0, 0);
        for (title, date, t) in [
            ("late", day(21), time(9)),
            ("early-afternoon", day(20), time(15)),
            ("early-morning", day(20), time(8)),
        ] {
            let d = TaskDraft {
                due_date: date,
                due_time: t,
                ..TaskDraft::new(title)
            };
            store.insert(&d, now()).unwrap();
        }
        let titles: Vec<_> = store
            .list(&TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["early-morning", "early-afternoon", "late"]);
    }

    #[test]
    fn reminder_candidates_skip_done_and_undated() {
        let (_dir, store) = create_test_store();
        let due = TaskDraft {
            due_date: NaiveDate::from_ymd_opt(2026, 10, 19),
            due_time: NaiveTime::from_hms_opt(15, 0, 0),
            ..TaskDraft::new("due")
        };
        store.insert(&due, now()).unwrap();
        store
            .insert(
                &TaskDraft {
                    status: Status::Done,
                    ..due.clone()
                },
                now(),
            )
            .unwrap();
        store
            .insert(
                &TaskDraft {
                    due_time: None,
                    ..due.clone()
                },
                now(),
            )
            .unwrap();

        let candidates = store.reminder_candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "due");
    }

    #[test]
    fn insert_records_keeps_completion_as_given() {
        let (_dir, store) = create_test_store();
        let records = vec![
            TaskRecord {
                draft: TaskDraft::new("a"),
                completed_at: None,
            },
            TaskRecord {
                draft: TaskDraft {
                    status: Status::Done,
                    ..TaskDraft::new("b")
                },
                completed_at: Some(now()),
            },
        ];
        assert_eq!(store.insert_records(&records).unwrap(), 2);
        assert_eq!(store.insert_records(&records).unwrap(), 2);
        assert_eq!(store.all().unwrap().len(), 4);
    }
}
