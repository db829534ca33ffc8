use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{persist_failed, session_mut, session_ref, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match Session::open(&path) {
        Ok(session) => {
            let summary = json!({
                "workspacePath": path.to_string_lossy(),
                "students": session.roster.len(),
                "attendanceRecords": session.book.records().len(),
            });
            state.workspace = Some(path);
            state.session = Some(session);
            ok(&req.id, summary)
        }
        Err(e) => err(&req.id, "workspace_open_failed", format!("{e:#}"), None),
    }
}

fn handle_settings_get(state: &AppState, req: &Request) -> serde_json::Value {
    let session = match session_ref(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    match serde_json::to_value(&session.settings) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

/// Patch semantics per field: absent leaves the value alone, null clears it,
/// a string replaces it.
fn patch_field(
    params: &serde_json::Value,
    key: &str,
    slot: &mut Option<String>,
) -> Result<(), HandlerErr> {
    match params.get(key) {
        None => Ok(()),
        Some(serde_json::Value::Null) => {
            *slot = None;
            Ok(())
        }
        Some(serde_json::Value::String(s)) => {
            *slot = Some(s.clone());
            Ok(())
        }
        Some(_) => Err(HandlerErr::bad_params(format!(
            "{} must be a string or null",
            key
        ))),
    }
}

fn settings_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = session_mut(state)?;
    let mut settings = session.settings.clone();
    patch_field(&req.params, "endpointUrl", &mut settings.endpoint_url)?;
    patch_field(&req.params, "spreadsheetId", &mut settings.spreadsheet_id)?;
    patch_field(&req.params, "coachName", &mut settings.coach_name)?;
    session.settings = settings;
    session.persist_settings().map_err(persist_failed)?;
    serde_json::to_value(&session.settings)
        .map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match settings_update(state, req) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
