use buildlens::dispatch::{run_log_range, run_raw, QueryError};
use buildlens::shared::RunId;
use buildlens::storage::Storage;

fn stored_run(storage: &Storage, body: &[u8]) -> RunId {
    let mut writer = storage
        .create_run("demo.tool", std::path::Path::new("/tmp"), &["demo".to_string()])
        .expect("create run");
    writer.append_log(body).expect("append");
    writer.complete(0).expect("complete").run_id
}

#[test]
fn byte_range_pagination_reports_remaining_data() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");
    let run_id = stored_run(&storage, b"hello world\n");

    let first = run_raw(&storage, run_id.as_str(), Some(0), Some(5)).expect("first page");
    assert_eq!(first.data, "hello");
    assert_eq!(first.length, 5);
    assert_eq!(first.total_bytes, 12);
    assert!(first.has_more);

    let second = run_raw(&storage, run_id.as_str(), Some(5), Some(7)).expect("second page");
    assert_eq!(second.data, " world\n");
    assert_eq!(second.length, 7);
    assert!(!second.has_more);
}

#[test]
fn line_range_past_the_end_is_an_empty_slice_not_an_error() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");
    let run_id = stored_run(&storage, b"one\ntwo\nthree\n");

    let response =
        run_log_range(&storage, run_id.as_str(), 9999, None).expect("past-end query");
    assert!(response.lines.is_empty());
    assert_eq!(response.start_line, 9999);
    assert_eq!(response.end_line, 9998);
    assert_eq!(response.total_lines, 3);
    assert!(!response.has_more);
}

#[test]
fn line_range_clamps_count_and_reports_more() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");
    let run_id = stored_run(&storage, b"a\nb\nc\nd\ne\n");

    let response =
        run_log_range(&storage, run_id.as_str(), 2, Some(2)).expect("middle slice");
    assert_eq!(response.lines, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(response.start_line, 2);
    assert_eq!(response.end_line, 3);
    assert_eq!(response.total_lines, 5);
    assert!(response.has_more);

    let tail = run_log_range(&storage, run_id.as_str(), 4, None).expect("tail slice");
    assert_eq!(tail.lines, vec!["d".to_string(), "e".to_string()]);
    assert_eq!(tail.end_line, 5);
    assert!(!tail.has_more);
}

#[test]
fn usage_errors_carry_stable_codes() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");
    let run_id = stored_run(&storage, b"x\n");

    let invalid = run_raw(&storage, "../../etc/passwd", None, None).expect_err("invalid id");
    assert_eq!(invalid.code(), "INVALID_RUN_ID");

    let unknown = RunId::generate();
    let missing = run_raw(&storage, unknown.as_str(), None, None).expect_err("unknown run");
    assert_eq!(missing.code(), "RUN_NOT_FOUND");

    let bad_start =
        run_log_range(&storage, run_id.as_str(), 0, None).expect_err("bad start line");
    assert!(matches!(bad_start, QueryError::InvalidStartLine));
    assert_eq!(bad_start.code(), "INVALID_START_LINE");
}

#[test]
fn repeated_queries_return_identical_results() {
    let dir = tempfile::tempdir().expect("storage root");
    let storage = Storage::open(dir.path()).expect("open storage");
    let run_id = stored_run(&storage, b"alpha\nbeta\n");

    let raw_a = run_raw(&storage, run_id.as_str(), None, None).expect("raw once");
    let raw_b = run_raw(&storage, run_id.as_str(), None, None).expect("raw twice");
    assert_eq!(raw_a, raw_b);

    let range_a = run_log_range(&storage, run_id.as_str(), 1, None).expect("range once");
    let range_b = run_log_range(&storage, run_id.as_str(), 1, None).expect("range twice");
    assert_eq!(range_a, range_b);
}
