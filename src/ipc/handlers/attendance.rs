use crate::ipc::error::ok;
use crate::ipc::helpers::{
    parse_status, persist_failed, required_date, required_status, required_str,
    required_string_array, session_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::session::Session;
use serde_json::json;

fn required_time_slot(params: &serde_json::Value) -> Result<String, HandlerErr> {
    let slot = required_str(params, "timeSlot")?;
    if slot.trim().is_empty() {
        return Err(HandlerErr::bad_params("timeSlot must not be empty"));
    }
    Ok(slot)
}

fn ensure_student_exists(session: &Session, id: &str) -> Result<(), HandlerErr> {
    if session.student(id).is_none() {
        return Err(HandlerErr::new(
            "not_found",
            format!("student not found: {id}"),
        ));
    }
    Ok(())
}

fn attendance_list(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = params.get("date").and_then(|v| v.as_str());
    let time_slot = params.get("timeSlot").and_then(|v| v.as_str());
    let records: Vec<_> = session
        .book
        .records()
        .iter()
        .filter(|r| date.map_or(true, |d| r.date == d))
        .filter(|r| time_slot.map_or(true, |t| r.time_slot == t))
        .collect();
    Ok(json!({
        "records": records,
        "canUndo": session.book.can_undo(),
    }))
}

fn attendance_mark(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let date = required_date(params, "date")?;
    let status = required_status(params, "status")?;
    let time_slot = required_time_slot(params)?;
    ensure_student_exists(session, &student_id)?;

    session.book.mark(&student_id, &date, status, &time_slot);
    session.persist_attendance().map_err(persist_failed)?;
    Ok(json!({ "canUndo": session.book.can_undo() }))
}

fn attendance_bulk_mark(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "date")?;
    let time_slot = required_time_slot(params)?;
    let entries = params
        .get("updates")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing updates"))?;

    // The whole set goes in under one snapshot, so everything is validated
    // before anything is applied.
    let mut updates: Vec<(String, AttendanceStatus)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let student_id = required_str(entry, "studentId")?;
        let status = entry
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerErr::bad_params("missing status"))
            .and_then(parse_status)?;
        ensure_student_exists(session, &student_id)?;
        updates.push((student_id, status));
    }

    session.book.bulk_mark(&updates, &date, &time_slot);
    session.persist_attendance().map_err(persist_failed)?;
    Ok(json!({
        "marked": updates.len(),
        "canUndo": session.book.can_undo(),
    }))
}

fn attendance_clear(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_ids = required_string_array(params, "studentIds")?;
    let date = required_date(params, "date")?;
    let time_slot = required_time_slot(params)?;

    session.book.clear(&student_ids, &date, &time_slot);
    session.persist_attendance().map_err(persist_failed)?;
    Ok(json!({ "canUndo": session.book.can_undo() }))
}

/// Destructive wipe: the caller must send confirm:true, standing in for the
/// confirmation prompt the UI used to show. Clears records, history, and the
/// persisted storage key.
fn attendance_clear_all(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    if params.get("confirm").and_then(|v| v.as_bool()) != Some(true) {
        return Err(HandlerErr::new(
            "confirm_required",
            "clearAll requires confirm:true",
        ));
    }
    session.book.clear_all();
    session.drop_attendance_key().map_err(persist_failed)?;
    Ok(json!({ "cleared": true }))
}

fn attendance_undo(
    session: &mut Session,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let undone = session.book.undo();
    if undone {
        session.persist_attendance().map_err(persist_failed)?;
    }
    Ok(json!({
        "undone": undone,
        "canUndo": session.book.can_undo(),
    }))
}

fn with_session(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut Session, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let session = match session_mut(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    match f(session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(with_session(state, req, attendance_list)),
        "attendance.mark" => Some(with_session(state, req, attendance_mark)),
        "attendance.bulkMark" => Some(with_session(state, req, attendance_bulk_mark)),
        "attendance.clear" => Some(with_session(state, req, attendance_clear)),
        "attendance.clearAll" => Some(with_session(state, req, attendance_clear_all)),
        "attendance.undo" => Some(with_session(state, req, attendance_undo)),
        _ => None,
    }
}
