use crate::ipc::error::ok;
use crate::ipc::helpers::{persist_failed, required_str, session_mut, session_ref, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{next_student_id, ArtsField, Gender, Student};
use crate::session::Session;
use serde_json::json;

fn parse_gender(params: &serde_json::Value) -> Result<Gender, HandlerErr> {
    let raw = required_str(params, "gender")?;
    serde_json::from_value(serde_json::Value::String(raw))
        .map_err(|_| HandlerErr::bad_params("gender must be LELAKI or PEREMPUAN"))
}

fn parse_field(params: &serde_json::Value) -> Result<ArtsField, HandlerErr> {
    let raw = required_str(params, "field")?;
    serde_json::from_value(serde_json::Value::String(raw))
        .map_err(|_| HandlerErr::bad_params("field must be one of MUZIK, VISUAL, TARI, TEATER"))
}

fn required_name(params: &serde_json::Value) -> Result<String, HandlerErr> {
    let name = required_str(params, "name")?;
    if name.trim().is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    Ok(name)
}

/// Builds a student from request params, without an id. Shared by create and
/// (per entry) import.
fn student_from_params(params: &serde_json::Value) -> Result<Student, HandlerErr> {
    Ok(Student {
        id: String::new(),
        name: required_name(params)?,
        gender: parse_gender(params)?,
        group: required_str(params, "group")?,
        form: required_str(params, "form")?,
        field: parse_field(params)?,
        role: params
            .get("role")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        notes: params
            .get("notes")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

fn students_list(session: &Session) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(&session.roster).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn students_create(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut student = student_from_params(params)?;
    student.id = next_student_id(&session.roster);
    session.roster.push(student.clone());
    session.persist_roster().map_err(persist_failed)?;
    serde_json::to_value(&student).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn students_update(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let replacement = student_from_params(params)?;
    let Some(existing) = session.roster.iter_mut().find(|s| s.id == id) else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };
    // The id is immutable; everything else is caller-supplied.
    existing.name = replacement.name;
    existing.gender = replacement.gender;
    existing.group = replacement.group;
    existing.form = replacement.form;
    existing.field = replacement.field;
    existing.role = replacement.role;
    existing.notes = replacement.notes;
    let updated = existing.clone();
    session.persist_roster().map_err(persist_failed)?;
    serde_json::to_value(&updated).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn students_delete(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let before = session.roster.len();
    session.roster.retain(|s| s.id != id);
    if session.roster.len() == before {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    session.persist_roster().map_err(persist_failed)?;
    Ok(json!({ "deleted": true }))
}

/// Bulk import: malformed entries are skipped and counted instead of failing
/// the batch.
fn students_import(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let entries = params
        .get("students")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing students"))?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for entry in entries {
        match student_from_params(entry) {
            Ok(mut student) => {
                student.id = next_student_id(&session.roster);
                session.roster.push(student);
                imported += 1;
            }
            Err(_) => skipped += 1,
        }
    }
    if imported > 0 {
        session.persist_roster().map_err(persist_failed)?;
    }
    Ok(json!({ "imported": imported, "skipped": skipped }))
}

fn notes_update(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let notes = required_str(params, "notes")?;
    let Some(student) = session.roster.iter_mut().find(|s| s.id == student_id) else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };
    student.notes = if notes.is_empty() { None } else { Some(notes) };
    session.persist_roster().map_err(persist_failed)?;
    Ok(json!({ "updated": true }))
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
        "students.list" => Some(match session_ref(state).and_then(students_list) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        "students.create" => Some(with_session(state, req, students_create)),
        "students.update" => Some(with_session(state, req, students_update)),
        "students.delete" => Some(with_session(state, req, students_delete)),
        "students.import" => Some(with_session(state, req, students_import)),
        "notes.update" => Some(with_session(state, req, notes_update)),
        _ => None,
    }
}
