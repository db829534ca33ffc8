use crate::ipc::error::ok;
use crate::ipc::helpers::{
    optional_str, persist_failed, required_date, required_str, session_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use crate::sync::{resolve_rows, WebhookClient};
use serde_json::json;

fn webhook(session: &Session) -> Result<WebhookClient, HandlerErr> {
    session
        .webhook()
        .map_err(|e| HandlerErr::new("no_endpoint", format!("{e:#}")))
}

/// Saves one session to the archive. No records for the (date, timeSlot)
/// pair is a validation error and never reaches the network. The request is
/// fire-and-forget: the remote's response body is not inspected.
fn sync_push(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let coach_name = required_str(params, "coachName")?;
    if coach_name.trim().is_empty() {
        return Err(HandlerErr::bad_params("coachName must not be empty"));
    }
    let date = required_date(params, "date")?;
    let time_slot = required_str(params, "timeSlot")?;

    let records = session.book.session_records(&date, &time_slot);
    if records.is_empty() {
        return Err(HandlerErr::new(
            "no_session_data",
            "no attendance recorded for this session",
        ));
    }

    let client = webhook(session)?;
    client
        .push_session(&coach_name, &session.roster, &records)
        .map_err(|e| HandlerErr::new("sync_failed", format!("{e:#}")))?;
    Ok(json!({ "pushed": records.len() }))
}

/// Refreshes one date from the archive. When any rows resolve against the
/// roster, every local record for that exact date is replaced wholesale —
/// including other time slots the remote did not return.
fn sync_pull(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "targetDate")?;
    let client = webhook(session)?;
    let rows = client
        .search(&date)
        .map_err(|e| HandlerErr::new("fetch_failed", format!("{e:#}")))?;
    let resolved = resolve_rows(&session.roster, &rows, &date);
    if resolved.is_empty() {
        return Err(HandlerErr::new(
            "no_remote_data",
            format!("no attendance found in the archive for {date}"),
        ));
    }
    let imported = resolved.len();
    session.book.replace_date(&date, resolved);
    session.persist_attendance().map_err(persist_failed)?;
    Ok(json!({ "date": date, "imported": imported }))
}

/// One search per calendar day, inclusive. Days whose request fails are
/// skipped and counted; everything fetched is merged with keyed
/// de-duplication, so re-running the same range adds nothing.
fn sync_pull_range(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let start_raw = required_date(params, "startDate")?;
    let end_raw = required_date(params, "endDate")?;
    let (start, end) = crate::reports::parse_range(&start_raw, &end_raw)
        .map_err(|e| HandlerErr::bad_params(format!("{e:#}")))?;

    let client = webhook(session)?;
    let mut batch = Vec::new();
    let mut fetched_days = 0usize;
    let mut failed_days = 0usize;
    let mut day = start;
    while day <= end {
        let date = day.format("%Y-%m-%d").to_string();
        match client.search(&date) {
            Ok(rows) => {
                batch.extend(resolve_rows(&session.roster, &rows, &date));
                fetched_days += 1;
            }
            Err(e) => {
                eprintln!("pullRange: fetch for {date} failed: {e:#}");
                failed_days += 1;
            }
        }
        day = day.succ_opt().ok_or_else(|| {
            HandlerErr::bad_params("endDate is out of the supported calendar range")
        })?;
    }

    let added = session.book.merge(batch);
    if added > 0 {
        session.persist_attendance().map_err(persist_failed)?;
    }
    Ok(json!({
        "added": added,
        "fetchedDays": fetched_days,
        "failedDays": failed_days,
    }))
}

/// Raw archive rows for one date, cached for later optimistic delete
/// bookkeeping. No roster matching, no local state change.
fn archive_search(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "targetDate")?;
    let client = webhook(session)?;
    let rows = client
        .search(&date)
        .map_err(|e| HandlerErr::new("fetch_failed", format!("{e:#}")))?;
    session.archive_cache = rows.clone();
    Ok(json!({ "count": rows.len(), "results": rows }))
}

/// Asks the remote to drop a session's rows, fire-and-forget. With narrowing
/// filters the cached search results are filtered optimistically; without
/// them the cache is cleared and the caller must re-search.
fn archive_delete(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "targetDate")?;
    let time_slot = required_str(params, "timeSlot")?;
    let group = optional_str(params, "group");
    let coach_name = optional_str(params, "coachName");

    let client = webhook(session)?;
    client
        .delete(&date, &time_slot, group.as_deref(), coach_name.as_deref())
        .map_err(|e| HandlerErr::new("sync_failed", format!("{e:#}")))?;

    let narrowed = group.is_some() || coach_name.is_some();
    let requires_research = if narrowed {
        session.archive_cache.retain(|row| {
            !(row.date == date
                && row.time_slot == time_slot
                && group.as_deref().map_or(true, |g| row.group == g)
                && coach_name.as_deref().map_or(true, |c| row.coach_name == c))
        });
        false
    } else {
        session.archive_cache.clear();
        true
    };
    Ok(json!({
        "requiresResearch": requires_research,
        "remaining": session.archive_cache.len(),
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
        "sync.push" => Some(with_session(state, req, sync_push)),
        "sync.pull" => Some(with_session(state, req, sync_pull)),
        "sync.pullRange" => Some(with_session(state, req, sync_pull_range)),
        "archive.search" => Some(with_session(state, req, archive_search)),
        "archive.delete" => Some(with_session(state, req, archive_delete)),
        _ => None,
    }
}
