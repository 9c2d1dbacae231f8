use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use taskboard::interchange;
use taskboard::reminder;
use taskboard::store::{TaskFilter, TaskStore};
use taskboard::task::{Priority, Status, TaskDraft, TaskRecord};
use taskboard::Error;
use tempfile::TempDir;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(16, 20, 5)
        .unwrap()
}

fn seeded_store(dir: &TempDir, name: &str) -> TaskStore {
    let store = TaskStore::open(dir.path().join(name)).unwrap();
    let drafts = [
        TaskDraft {
            title: "Buy milk".into(),
            description: Some("semi-skimmed, \"two\" cartons".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 10, 19),
            due_time: NaiveTime::from_hms_opt(18, 0, 0),
            priority: Priority::Low,
            status: Status::ToDo,
        },
        TaskDraft {
            title: "Quarterly report".into(),
            description: Some("numbers\nand charts".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 10, 31),
            due_time: None,
            priority: Priority::High,
            status: Status::Review,
        },
        TaskDraft {
            title: "Fix bike".into(),
            status: Status::Done,
            ..TaskDraft::new("Fix bike")
        },
        TaskDraft::new("Buy milk"),
    ];
    for draft in &drafts {
        store.insert(draft, now()).unwrap();
    }
    store
}

/// Multiset of everything except the id.
fn tuples(store: &TaskStore) -> BTreeMap<String, usize> {
    let mut seen = BTreeMap::new();
    for task in store.all().unwrap() {
        *seen.entry(format!("{:?}", task.record())).or_insert(0) += 1;
    }
    seen
}

#[test]
fn export_then_import_reproduces_rows_with_fresh_ids() {
    let dir = TempDir::new().unwrap();
    let source = seeded_store(&dir, "source.db");
    let csv = dir.path().join("tasks.csv");
    assert_eq!(interchange::export(&source, &csv).unwrap(), 4);

    let target = TaskStore::open(dir.path().join("target.db")).unwrap();
    target.insert(&TaskDraft::new("already here"), now()).unwrap();
    assert_eq!(interchange::import(&target, &csv).unwrap(), 4);

    let mut imported = tuples(&target);
    let existing = format!(
        "{:?}",
        TaskRecord {
            draft: TaskDraft::new("already here"),
            completed_at: None,
        }
    );
    assert_eq!(imported.remove(&existing), Some(1));
    assert_eq!(imported, tuples(&source));

    let source_ids: Vec<_> = source.all().unwrap().iter().map(|t| t.id).collect();
    let target_ids: Vec<_> = target.all().unwrap().iter().skip(1).map(|t| t.id).collect();
    assert_ne!(source_ids, target_ids);
}

#[test]
fn completion_invariant_holds_after_every_write() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, "tasks.db");
    let check = |store: &TaskStore| {
        for task in store.all().unwrap() {
            assert_eq!(task.completed_at.is_some(), task.status == Status::Done, "{task:?}");
        }
    };
    check(&store);

    let ids: Vec<_> = store.all().unwrap().iter().map(|t| t.id).collect();
    for (i, id) in ids.iter().enumerate() {
        let status = Status::ALL[(i + 1) % Status::ALL.len()];
        store.set_status(*id, status, now()).unwrap();
        check(&store);
        let mut draft = store.get(*id).unwrap().unwrap().draft();
        draft.status = status.next();
        store.update(*id, &draft, now()).unwrap();
        check(&store);
    }
}

#[test]
fn filters_compose() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, "tasks.db");

    let high = store
        .list(&TaskFilter::text("milk").with_priority(Some(Priority::High)))
        .unwrap();
    assert!(high.is_empty());

    let charts = store.list(&TaskFilter::text("charts")).unwrap();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].title, "Quarterly report");

    let milk = store.list(&TaskFilter::text("MILK")).unwrap();
    assert_eq!(milk.len(), 2);
}

#[test]
fn buy_milk_reminder_scenario() {
    let dir = TempDir::new().unwrap();
    let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
    let window = std::time::Duration::from_secs(300);
    let due = |minutes| {
        let at = now() + TimeDelta::minutes(minutes);
        TaskDraft {
            due_date: Some(at.date()),
            due_time: Some(at.time()),
            ..TaskDraft::new("Buy milk")
        }
    };

    let id = store.insert(&due(2), now()).unwrap();
    let hits = reminder::scan(&store, now(), window).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].task_id, id);

    store.update(id, &due(10), now()).unwrap();
    assert!(reminder::scan(&store, now(), window).unwrap().is_empty());
}

#[test]
fn deleting_unknown_id_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, "tasks.db");
    let before = store.all().unwrap();

    let err = store.delete(9_999).unwrap_err();
    assert!(matches!(err, Error::NotFound(9_999)));
    assert_eq!(store.all().unwrap(), before);
}
