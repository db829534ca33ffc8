
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_workspace};

const SLOT: &str = "8:00 - 11:00";

fn select(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    workspace: &tempfile::TempDir,
) {
    request_ok(
        stdin,
        reader,
        "select",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
}

fn list_records(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    params: serde_json::Value,
) -> Vec<serde_json::Value> {
    request_ok(stdin, reader, id, "attendance.list", params)["records"]
        .as_array()
        .expect("records array")
        .clone()
}

#[test]
fn remarking_replaces_instead_of_duplicating() {
    let workspace = temp_workspace("kehadiran-mark-dedupe");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-01-05", "status": "PRESENT", "timeSlot": SLOT }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-01-05", "status": "ABSENT", "timeSlot": SLOT }),
    );

    let records = list_records(&mut stdin, &mut reader, "3", json!({ "date": "2024-01-05" }));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "ABSENT");

    // A different slot on the same date is a separate session.
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-01-05", "status": "PRESENT", "timeSlot": "2:30 - 4:30" }),
    );
    let records = list_records(&mut stdin, &mut reader, "5", json!({ "date": "2024-01-05" }));
    assert_eq!(records.len(), 2);
}

#[test]
fn marking_an_unknown_student_is_rejected() {
    let workspace = temp_workspace("kehadiran-mark-unknown");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "999", "date": "2024-01-05", "status": "PRESENT", "timeSlot": SLOT }),
    );
    assert_eq!(error["code"], "not_found");

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": "1", "date": "05/01/2024", "status": "PRESENT", "timeSlot": SLOT }),
    );
    assert_eq!(error["code"], "bad_params");

    let records = list_records(&mut stdin, &mut reader, "3", json!({}));
    assert!(records.is_empty());
}

#[test]
fn bulk_mark_is_one_undo_step() {
    let workspace = temp_workspace("kehadiran-bulk");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.bulkMark",
        json!({
            "date": "2024-01-05",
            "timeSlot": SLOT,
            "updates": [
                { "studentId": "1", "status": "PRESENT" },
                { "studentId": "2", "status": "PRESENT" },
                { "studentId": "3", "status": "ABSENT" }
            ]
        }),
    );
    assert_eq!(marked["marked"], 3);
    assert_eq!(marked["canUndo"], true);

    let records = list_records(&mut stdin, &mut reader, "2", json!({ "date": "2024-01-05" }));
    assert_eq!(records.len(), 3);

    let undone = request_ok(&mut stdin, &mut reader, "3", "attendance.undo", json!({}));
    assert_eq!(undone["undone"], true);
    let records = list_records(&mut stdin, &mut reader, "4", json!({ "date": "2024-01-05" }));
    assert!(records.is_empty());
}

#[test]
fn bulk_mark_validates_everything_before_applying_anything() {
    let workspace = temp_workspace("kehadiran-bulk-atomic");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.bulkMark",
        json!({
            "date": "2024-01-05",
            "timeSlot": SLOT,
            "updates": [
                { "studentId": "1", "status": "PRESENT" },
                { "studentId": "999", "status": "PRESENT" }
            ]
        }),
    );
    assert_eq!(error["code"], "not_found");

    let records = list_records(&mut stdin, &mut reader, "2", json!({}));
    assert!(records.is_empty());
}

#[test]
fn clear_removes_only_the_named_session_marks() {
    let workspace = temp_workspace("kehadiran-clear");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.bulkMark",
        json!({
            "date": "2024-01-05",
            "timeSlot": SLOT,
            "updates": [
                { "studentId": "1", "status": "PRESENT" },
                { "studentId": "2", "status": "PRESENT" }
            ]
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.clear",
        json!({ "studentIds": ["1"], "date": "2024-01-05", "timeSlot": SLOT }),
    );

    let records = list_records(&mut stdin, &mut reader, "3", json!({ "date": "2024-01-05" }));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["studentId"], "2");
}

#[test]
fn undo_history_holds_twenty_snapshots() {
    let workspace = temp_workspace("kehadiran-undo-depth");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    // 25 mutations on distinct dates; the history keeps the latest 20, so
    // exhausting the undos lands on the state after the first five marks.
    for day in 1..=25 {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("mark-{day}"),
            "attendance.mark",
            json!({
                "studentId": "1",
                "date": format!("2024-01-{day:02}"),
                "status": "PRESENT",
                "timeSlot": SLOT
            }),
        );
    }

    for step in 1..=20 {
        let undone = request_ok(
            &mut stdin,
            &mut reader,
            &format!("undo-{step}"),
            "attendance.undo",
            json!({}),
        );
        assert_eq!(undone["undone"], true, "undo step {step}");
    }

    let exhausted = request_ok(&mut stdin, &mut reader, "exhausted", "attendance.undo", json!({}));
    assert_eq!(exhausted["undone"], false);
    assert_eq!(exhausted["canUndo"], false);

    let records = list_records(&mut stdin, &mut reader, "final", json!({}));
    assert_eq!(records.len(), 5);
    let mut dates: Vec<&str> = records.iter().map(|r| r["date"].as_str().unwrap()).collect();
    dates.sort();
    assert_eq!(
        dates,
        vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
    );
}

#[test]
fn clear_all_needs_confirmation_and_erases_history() {
    let workspace = temp_workspace("kehadiran-clear-all");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-01-05", "status": "PRESENT", "timeSlot": SLOT }),
    );

    let error = request_err(&mut stdin, &mut reader, "2", "attendance.clearAll", json!({}));
    assert_eq!(error["code"], "confirm_required");
    assert_eq!(
        list_records(&mut stdin, &mut reader, "3", json!({})).len(),
        1
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.clearAll",
        json!({ "confirm": true }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "attendance.list", json!({}));
    assert!(listed["records"].as_array().unwrap().is_empty());
    assert_eq!(listed["canUndo"], false);

    let undone = request_ok(&mut stdin, &mut reader, "6", "attendance.undo", json!({}));
    assert_eq!(undone["undone"], false);
}

#[test]
fn attendance_persists_across_sessions() {
    let workspace = temp_workspace("kehadiran-attendance-persist");
    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        select(&mut stdin, &mut reader, &workspace);
        request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "attendance.mark",
            json!({ "studentId": "2", "date": "2024-01-05", "status": "ABSENT", "timeSlot": SLOT }),
        );
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    assert_eq!(selected["attendanceRecords"], 1);

    // Undo history is in-memory only, so a fresh session starts with none.
    let listed = request_ok(&mut stdin, &mut reader, "2", "attendance.list", json!({}));
    assert_eq!(listed["canUndo"], false);
    assert_eq!(listed["records"][0]["studentId"], "2");
}
