use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::model::AttendanceStatus;
use crate::session::Session;

/// Handler-layer error: a code plus message, turned into an error envelope
/// once the request id is known.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> HandlerErr {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> HandlerErr {
        HandlerErr::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn required_string_array(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<String>, HandlerErr> {
    let items = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    Ok(items
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}

/// Dates travel as "YYYY-MM-DD" strings; anything else is a validation error
/// before any state is touched.
pub fn required_date(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = required_str(params, key)?;
    crate::reports::parse_date(&raw)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))?;
    Ok(raw)
}

pub fn required_status(
    params: &serde_json::Value,
    key: &str,
) -> Result<AttendanceStatus, HandlerErr> {
    let raw = required_str(params, key)?;
    parse_status(&raw)
}

pub fn parse_status(raw: &str) -> Result<AttendanceStatus, HandlerErr> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| HandlerErr::bad_params("status must be PRESENT or ABSENT"))
}

pub fn session_mut<'a>(state: &'a mut AppState) -> Result<&'a mut Session, HandlerErr> {
    state
        .session
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn session_ref<'a>(state: &'a AppState) -> Result<&'a Session, HandlerErr> {
    state
        .session
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn persist_failed(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("persist_failed", format!("{e:#}"))
}
