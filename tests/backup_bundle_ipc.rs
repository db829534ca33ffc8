
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_workspace};

const SLOT: &str = "8:00 - 11:00";

#[test]
fn export_then_import_moves_a_workspace() {
    let source = temp_workspace("kehadiran-backup-src");
    let target = temp_workspace("kehadiran-backup-dst");
    let bundle = source.path().join("bundles/backup.zip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // Build up state in the source workspace.
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": source.path().to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "HANA BINTI ZULKIFLI",
            "gender": "PEREMPUAN",
            "group": "2 CATAN",
            "form": "2 AMANAH",
            "field": "VISUAL"
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "studentId": "1", "date": "2024-01-05", "status": "PRESENT", "timeSlot": SLOT }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "settings.update",
        json!({ "coachName": "CIKGU AMIR" }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(exported["bundleFormat"], "kehadiran-workspace-v1");
    // Three data documents plus the manifest and workspace metadata.
    assert_eq!(exported["entryCount"], 5);
    assert!(bundle.exists());

    // Import into a fresh workspace and check the state came across.
    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "workspace.select",
        json!({ "path": target.path().to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "backup.import",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["bundleFormat"], "kehadiran-workspace-v1");
    assert_eq!(
        imported["installedKeys"],
        json!(["art_students", "art_attendance", "art_settings"])
    );

    let roster = request_ok(&mut stdin, &mut reader, "8", "students.list", json!({}));
    let students = roster.as_array().unwrap();
    assert_eq!(students.len(), 9);
    assert!(students.iter().any(|s| s["name"] == "HANA BINTI ZULKIFLI"));

    let listed = request_ok(&mut stdin, &mut reader, "9", "attendance.list", json!({}));
    let records = listed["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["studentId"], "1");
    // The reload starts with a clean undo history.
    assert_eq!(listed["canUndo"], false);

    let settings = request_ok(&mut stdin, &mut reader, "10", "settings.get", json!({}));
    assert_eq!(settings["coachName"], "CIKGU AMIR");
}

#[test]
fn import_of_a_missing_bundle_fails_cleanly() {
    let workspace = temp_workspace("kehadiran-backup-missing");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "backup.import",
        json!({ "inPath": workspace.path().join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error["code"], "import_failed");

    // The session is untouched after a failed import.
    let roster = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(roster.as_array().unwrap().len(), 8);
}
