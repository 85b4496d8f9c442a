//! Registry lifecycle, not-found, corruption and concurrency integration tests.
//! Store layout: <root>/data/forked-tasks.json

use std::fs;
use std::path::PathBuf;
use std::thread;

use assert_fs::prelude::*;
use forkterm_core::{
    ClearScope, FailureKind, NewTask, RegistryError, TaskId, TaskKind, TaskRegistry, TaskStatus,
    TaskUpdate,
};
use predicates::prelude::*;

fn raw(payload: &str) -> NewTask {
    NewTask::new(TaskKind::Raw, payload, PathBuf::from("/work"))
}

fn complete(reg: &TaskRegistry, id: &TaskId) {
    reg.update(
        id,
        TaskUpdate {
            status: Some(TaskStatus::Completed),
            notes: None,
        },
    )
    .expect("complete");
}

// ---------------------------------------------------------------------------
// 1. Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn add_update_clear_lifecycle() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());

    let rec = reg.add(raw("echo hi")).expect("add");
    let listed = reg.list(None).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, rec.id);
    assert_eq!(listed[0].status, TaskStatus::Running);

    let updated = reg
        .update(
            &rec.id,
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                notes: Some("done by hand".into()),
            },
        )
        .expect("update");
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.created_at, rec.created_at, "created_at must not move");
    let completed_at = updated.completed_at.expect("completed_at set");
    assert!(rec.created_at <= completed_at);

    let listed = reg.list(None).expect("list");
    assert_eq!(listed[0].status, TaskStatus::Completed);
    assert_eq!(listed[0].notes.as_deref(), Some("done by hand"));

    assert_eq!(reg.clear(ClearScope::Status(TaskStatus::Completed)).expect("clear"), 1);
    assert!(reg.list(None).expect("list").is_empty());
}

#[test]
fn add_grows_list_by_exactly_one_fresh_running_record() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    for n in 0..5 {
        let before = reg.list(None).expect("list");
        let rec = reg.add(raw(&format!("job {n}"))).expect("add");
        let after = reg.list(None).expect("list");
        assert_eq!(after.len(), before.len() + 1);
        assert!(before.iter().all(|t| t.id != rec.id), "id must be fresh");
        assert_eq!(after.last().map(|t| &t.id), Some(&rec.id), "insertion order");
        assert_eq!(after.last().map(|t| t.status), Some(TaskStatus::Running));
    }
}

#[test]
fn list_filter_preserves_insertion_order() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    let a = reg.add(raw("a")).expect("a");
    let b = reg.add(raw("b")).expect("b");
    let c = reg.add(raw("c")).expect("c");
    complete(&reg, &a.id);
    complete(&reg, &c.id);

    let done: Vec<TaskId> = reg
        .list(Some(TaskStatus::Completed))
        .expect("list")
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(done, vec![a.id, c.id]);
    let running = reg.list(Some(TaskStatus::Running)).expect("list");
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, b.id);
}

// ---------------------------------------------------------------------------
// 2. Not-found leaves the store untouched
// ---------------------------------------------------------------------------

#[test]
fn update_and_remove_unknown_id_leave_file_byte_identical() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    reg.add(raw("keep me")).expect("add");
    let before = fs::read(reg.path()).expect("read");

    let ghost = TaskId::from("deadbeef");
    let err = reg
        .update(
            &ghost,
            TaskUpdate {
                status: Some(TaskStatus::Failed),
                notes: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::TaskNotFound { .. }), "got: {err}");
    assert_eq!(err.kind(), FailureKind::RegistryNotFound);

    let err = reg.remove(&ghost).unwrap_err();
    assert_eq!(err.kind(), FailureKind::RegistryNotFound);
    assert!(err.to_string().contains("deadbeef"));

    assert_eq!(fs::read(reg.path()).expect("read"), before);
}

#[test]
fn remove_deletes_only_the_named_record() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    let a = reg.add(raw("a")).expect("a");
    let b = reg.add(raw("b")).expect("b");
    reg.remove(&a.id).expect("remove");
    let left = reg.list(None).expect("list");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, b.id);
    assert!(matches!(reg.get(&a.id), Err(RegistryError::TaskNotFound { .. })));
}

// ---------------------------------------------------------------------------
// 3. Clear and summary
// ---------------------------------------------------------------------------

#[test]
fn selective_clear_removes_exactly_matching_records() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    let ids: Vec<TaskId> = (0..6)
        .map(|n| reg.add(raw(&format!("t{n}"))).expect("add").id)
        .collect();
    complete(&reg, &ids[0]);
    complete(&reg, &ids[3]);
    reg.update(
        &ids[4],
        TaskUpdate {
            status: Some(TaskStatus::Failed),
            notes: None,
        },
    )
    .expect("fail");

    let removed = reg.clear(ClearScope::Status(TaskStatus::Completed)).expect("clear");
    assert_eq!(removed, 2);
    let left = reg.list(None).expect("list");
    assert_eq!(left.len(), 4);
    assert!(left.iter().all(|t| t.status != TaskStatus::Completed));
    assert_eq!(reg.list(Some(TaskStatus::Failed)).expect("list").len(), 1);

    assert_eq!(reg.clear(ClearScope::All).expect("clear all"), 4);
    assert!(reg.list(None).expect("list").is_empty());
}

#[test]
fn summary_counts_sum_to_list_length() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    let ids: Vec<TaskId> = (0..7)
        .map(|n| reg.add(raw(&format!("t{n}"))).expect("add").id)
        .collect();
    complete(&reg, &ids[1]);
    complete(&reg, &ids[2]);
    reg.update(
        &ids[5],
        TaskUpdate {
            status: Some(TaskStatus::Failed),
            notes: None,
        },
    )
    .expect("fail");

    let s = reg.status_summary().expect("summary");
    assert_eq!(s.total, reg.list(None).expect("list").len());
    assert_eq!(s.running + s.completed + s.failed, s.total);
    assert_eq!((s.running, s.completed, s.failed), (4, 2, 1));

    let report = reg.status_report().expect("report");
    assert_eq!(report.running_tasks.len(), 4);
    assert_eq!(report.recent_completed.len(), 2);
    assert_eq!(report.recent_failed.len(), 1);
}

// ---------------------------------------------------------------------------
// 4. Corruption and atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn corrupt_store_is_reported_and_left_untouched() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = root.child("data/forked-tasks.json");
    store.write_str("{ \"tasks\": [ {not json").expect("write");
    let reg = TaskRegistry::at(root.path());

    let err = reg.list(None).unwrap_err();
    assert!(matches!(err, RegistryError::Corrupt { .. }), "got: {err}");
    assert_eq!(err.kind(), FailureKind::RegistryCorrupt);
    assert!(err.to_string().contains("forked-tasks.json"));

    let err = reg.add(raw("x")).unwrap_err();
    assert_eq!(err.kind(), FailureKind::RegistryCorrupt);
    store.assert("{ \"tasks\": [ {not json");
    root.child("data/forked-tasks.json.lock")
        .assert(predicate::path::missing());
}

#[test]
fn wrong_shape_store_is_corrupt() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("data/forked-tasks.json")
        .write_str("[1, 2, 3]")
        .expect("write");
    let err = TaskRegistry::at(root.path()).status_summary().unwrap_err();
    assert_eq!(err.kind(), FailureKind::RegistryCorrupt);
}

#[test]
fn crash_leftover_tmp_does_not_affect_store() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    let rec = reg.add(raw("survivor")).expect("add");
    let original = fs::read(reg.path()).expect("read");

    // Simulate crash: .tmp written but process died before rename
    root.child("data/forked-tasks.json.tmp")
        .write_str("CRASH - INCOMPLETE WRITE")
        .expect("write tmp");
    assert_eq!(fs::read(reg.path()).expect("read"), original);
    assert_eq!(reg.get(&rec.id).expect("get").payload, "survivor");

    // The next successful save replaces the orphan.
    reg.add(raw("next")).expect("add");
    root.child("data/forked-tasks.json.tmp")
        .assert(predicate::path::missing());
}

#[test]
fn document_layout_matches_contract() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let reg = TaskRegistry::at(root.path());
    reg.add(raw("echo hi").with_tier(Some("haiku".into()))).expect("add");

    let doc: serde_json::Value =
        serde_json::from_slice(&fs::read(reg.path()).expect("read")).expect("json");
    assert!(doc["tasks"].is_array());
    assert!(doc["metadata"]["created"].is_string());
    assert!(doc["metadata"]["updated"].is_string());
    let task = &doc["tasks"][0];
    assert_eq!(task["kind"], "raw");
    assert_eq!(task["payload"], "echo hi");
    assert_eq!(task["tier"], "haiku");
    assert_eq!(task["status"], "running");
    assert!(task["completed_at"].is_null());
}

// ---------------------------------------------------------------------------
// 5. Independent writers
// ---------------------------------------------------------------------------

#[test]
fn quick_successive_adds_get_distinct_ids() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let first = TaskRegistry::at(root.path()).add(raw("one")).expect("one");
    let second = TaskRegistry::at(root.path()).add(raw("two")).expect("two");
    assert_ne!(first.id, second.id);
    let ids: Vec<TaskId> = TaskRegistry::at(root.path())
        .list(None)
        .expect("list")
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[test]
fn concurrent_writers_lose_no_updates() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let root_path = root.path().to_path_buf();

    let handles: Vec<_> = (0..6)
        .map(|worker| {
            let root_path = root_path.clone();
            thread::spawn(move || {
                let reg = TaskRegistry::at(&root_path)
                    .with_lock_timeout(std::time::Duration::from_secs(20));
                (0..5)
                    .map(|n| reg.add(raw(&format!("w{worker}-{n}"))).expect("add").id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<TaskId> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("join"))
        .collect();
    let stored = TaskRegistry::at(&root_path).list(None).expect("list");
    assert_eq!(stored.len(), 30);

    ids.sort_by(|a, b| a.0.cmp(&b.0));
    ids.dedup();
    assert_eq!(ids.len(), 30, "ids must be unique");
}
