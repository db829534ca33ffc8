use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;

fn backup_export(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(workspace) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let Some(session) = state.session.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let out_path = PathBuf::from(required_str(&req.params, "outPath")?);
    let summary = backup::export_workspace_bundle(session.store(), &workspace, &out_path)
        .map_err(|e| HandlerErr::new("export_failed", format!("{e:#}")))?;
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "outPath": out_path.to_string_lossy(),
    }))
}

/// Installs the bundle's documents, then reopens the session so in-memory
/// state matches what landed on disk. Undo history does not survive the
/// reload.
fn backup_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(workspace) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let Some(session) = state.session.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let in_path = PathBuf::from(required_str(&req.params, "inPath")?);
    let summary = backup::import_workspace_bundle(&in_path, session.store())
        .map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;
    let reopened = Session::open(&workspace)
        .map_err(|e| HandlerErr::new("workspace_open_failed", format!("{e:#}")))?;
    state.session = Some(reopened);
    Ok(json!({
        "bundleFormat": summary.bundle_format_detected,
        "installedKeys": summary.installed_keys,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(match backup_export(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        "backup.import" => Some(match backup_import(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        _ => None,
    }
}
