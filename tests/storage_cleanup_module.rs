use buildlens::shared::RunId;
use buildlens::storage::{cleanup_old_runs, Storage, META_FILE, RETENTION_DAYS};
use chrono::{Duration, Utc};

fn complete_run(storage: &Storage, body: &[u8]) -> RunId {
    let mut writer = storage
        .create_run("demo.tool", std::path::Path::new("/tmp"), &["demo".to_string()])
        .expect("create run");
    writer.append_log(body).expect("append");
    writer.complete(0).expect("complete").run_id
}

fn age_run(root: &std::path::Path, run_id: &RunId, days: i64) {
    let meta_path = root.join("runs").join(run_id.as_str()).join(META_FILE);
    let raw = std::fs::read_to_string(&meta_path).expect("read meta");
    let mut meta: serde_json::Value = serde_json::from_str(&raw).expect("parse meta");
    let completed = Utc::now() - Duration::days(days);
    meta["completedAt"] = serde_json::Value::String(completed.to_rfc3339());
    std::fs::write(&meta_path, serde_json::to_vec(&meta).expect("serialize meta"))
        .expect("write meta");
}

#[test]
fn sweep_removes_only_runs_past_the_retention_window() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");

    let old = complete_run(&storage, b"old\n");
    let fresh = complete_run(&storage, b"fresh\n");
    age_run(dir.path(), &old, RETENTION_DAYS + 1);
    age_run(dir.path(), &fresh, RETENTION_DAYS - 1);

    let removed = cleanup_old_runs(dir.path(), Utc::now(), RETENTION_DAYS).expect("sweep");
    assert_eq!(removed, 1);
    assert!(storage.get_run(&old).expect("lookup old").is_none());
    assert!(storage.get_run(&fresh).expect("lookup fresh").is_some());
}

#[test]
fn sweep_leaves_unfinished_and_malformed_runs_alone() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");

    // a writer still owns this run: no metadata record yet
    let writer = storage
        .create_run("demo.tool", std::path::Path::new("/tmp"), &["demo".to_string()])
        .expect("create run");
    let in_progress = writer.run_id().clone();

    // a run whose metadata no longer parses
    let corrupt = complete_run(&storage, b"x\n");
    let corrupt_meta = dir
        .path()
        .join("runs")
        .join(corrupt.as_str())
        .join(META_FILE);
    std::fs::write(&corrupt_meta, b"{ not json").expect("corrupt meta");

    // a directory that is not a run at all
    std::fs::create_dir(dir.path().join("runs").join("not-a-uuid")).expect("stray dir");

    let removed = cleanup_old_runs(dir.path(), Utc::now(), RETENTION_DAYS).expect("sweep");
    assert_eq!(removed, 0);
    assert!(dir.path().join("runs").join(in_progress.as_str()).exists());
    assert!(dir.path().join("runs").join(corrupt.as_str()).exists());
    assert!(dir.path().join("runs").join("not-a-uuid").exists());
}

#[test]
fn configured_retention_window_overrides_the_default() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");

    let run = complete_run(&storage, b"x\n");
    age_run(dir.path(), &run, 3);

    assert_eq!(storage.cleanup(Utc::now(), RETENTION_DAYS).expect("sweep"), 0);
    assert_eq!(storage.cleanup(Utc::now(), 2).expect("short sweep"), 1);
}
