use crate::ipc::error::ok;
use crate::ipc::helpers::{required_date, session_ref, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::reports::{self, Granularity};
use crate::session::Session;
use chrono::NaiveDate;
use serde_json::json;

fn parse_report_range(params: &serde_json::Value) -> Result<(NaiveDate, NaiveDate), HandlerErr> {
    let start = required_date(params, "startDate")?;
    let end = required_date(params, "endDate")?;
    reports::parse_range(&start, &end).map_err(|e| HandlerErr::bad_params(format!("{e:#}")))
}

fn parse_granularity(params: &serde_json::Value, default: Granularity) -> Result<Granularity, HandlerErr> {
    match params.get("granularity").and_then(|v| v.as_str()) {
        None => Ok(default),
        Some(raw) => Granularity::parse(raw).ok_or_else(|| {
            HandlerErr::bad_params("granularity must be one of DAILY, WEEKLY, MONTHLY")
        }),
    }
}

fn reports_trend(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (start, end) = parse_report_range(params)?;
    let granularity = parse_granularity(params, Granularity::Daily)?;
    let buckets = reports::trend(
        &session.roster,
        session.book.records(),
        start,
        end,
        granularity,
    );
    Ok(json!({ "buckets": buckets }))
}

fn reports_fields(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (start, end) = parse_report_range(params)?;
    let rates = reports::field_rates(&session.roster, session.book.records(), start, end);
    Ok(json!({ "fields": rates }))
}

fn reports_overview(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (start, end) = parse_report_range(params)?;
    let granularity = parse_granularity(params, Granularity::Daily)?;
    let buckets = reports::trend(
        &session.roster,
        session.book.records(),
        start,
        end,
        granularity,
    );
    let overview = reports::overview(&session.roster, &buckets);
    serde_json::to_value(&overview).map_err(|e| HandlerErr::new("internal", e.to_string()))
}

fn with_session(
    state: &AppState,
    req: &Request,
    f: impl FnOnce(&Session, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let session = match session_ref(state) {
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
        "reports.trend" => Some(with_session(state, req, reports_trend)),
        "reports.fields" => Some(with_session(state, req, reports_fields)),
        "reports.overview" => Some(with_session(state, req, reports_overview)),
        _ => None,
    }
}
