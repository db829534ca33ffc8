use crate::model::{ArchiveRow, AttendanceRecord, AttendanceStatus, Student};
use anyhow::{anyhow, Context};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

/// The Apps Script endpoint reads the raw POST body, so requests go out as
/// text/plain JSON rather than application/json.
const BODY_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Client for the spreadsheet-backed webhook. One URL, POST only; sync and
/// delete are fire-and-forget (the response body is never parsed), search
/// expects a JSON array of denormalized rows.
pub struct WebhookClient {
    http: Client,
    endpoint: String,
    spreadsheet_id: Option<String>,
}

impl WebhookClient {
    pub fn new(endpoint: &str, spreadsheet_id: Option<&str>) -> anyhow::Result<WebhookClient> {
        // No request timeout: a hung remote blocks the operation until the
        // OS gives up, which is the behavior the spreadsheet-side scripts
        // were written against.
        let http = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .context("failed to build webhook client")?;
        Ok(WebhookClient {
            http,
            endpoint: endpoint.to_string(),
            spreadsheet_id: spreadsheet_id.map(str::to_string),
        })
    }

    fn post(&self, mut body: serde_json::Value) -> anyhow::Result<reqwest::blocking::Response> {
        if let Some(id) = &self.spreadsheet_id {
            body["spreadsheetId"] = serde_json::Value::String(id.clone());
        }
        let text = serde_json::to_string(&body).context("failed to serialize webhook request")?;
        self.http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, BODY_CONTENT_TYPE)
            .body(text)
            .send()
            .context("webhook request failed")
    }

    /// `sync_attendance`: appends the session's rows to the archive.
    /// Success is "the request did not throw"; the body is ignored.
    pub fn push_session(
        &self,
        coach_name: &str,
        roster: &[Student],
        session: &[AttendanceRecord],
    ) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "action": "sync_attendance",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "coachName": coach_name,
            "students": roster,
            "attendance": session,
        });
        self.post(body)?;
        Ok(())
    }

    /// `search_attendance`: returns the archive rows for one date. Rows that
    /// do not deserialize are skipped rather than failing the batch; a JSON
    /// error object from the remote becomes an error.
    pub fn search(&self, date: &str) -> anyhow::Result<Vec<ArchiveRow>> {
        let resp = self.post(serde_json::json!({
            "action": "search_attendance",
            "targetDate": date,
        }))?;
        let value: serde_json::Value = resp.json().context("webhook response is not JSON")?;
        match value {
            serde_json::Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| serde_json::from_value::<ArchiveRow>(v).ok())
                .collect()),
            other => {
                if let Some(msg) = other.get("error").and_then(|e| e.as_str()) {
                    Err(anyhow!("remote error: {msg}"))
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }

    /// `delete_attendance`: fire-and-forget drop of archive rows for one
    /// session, optionally narrowed by group and coach.
    pub fn delete(
        &self,
        date: &str,
        time_slot: &str,
        group: Option<&str>,
        coach_name: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({
            "action": "delete_attendance",
            "targetDate": date,
            "timeSlot": time_slot,
        });
        if let Some(g) = group {
            body["group"] = serde_json::Value::String(g.to_string());
        }
        if let Some(c) = coach_name {
            body["coachName"] = serde_json::Value::String(c.to_string());
        }
        self.post(body)?;
        Ok(())
    }
}

/// "HADIR", "PRESENT" and "Hadir" are the spellings the archive has used for
/// presence; everything else counts as absent.
pub fn normalize_status(raw: &str) -> AttendanceStatus {
    match raw.trim() {
        "HADIR" | "PRESENT" | "Hadir" => AttendanceStatus::Present,
        _ => AttendanceStatus::Absent,
    }
}

/// Maps a remote row back to a roster student by case-insensitive trimmed
/// name. The archive carries no stable id, so the first match wins and
/// duplicate names are ambiguous by construction.
pub fn match_student<'a>(roster: &'a [Student], name: &str) -> Option<&'a Student> {
    let wanted = name.trim().to_uppercase();
    roster.iter().find(|s| s.name.trim().to_uppercase() == wanted)
}

/// Turns archive rows into local records. Rows without a roster match are
/// dropped; missing dates fall back to the searched date and missing time
/// slots to "N/A".
pub fn resolve_rows(
    roster: &[Student],
    rows: &[ArchiveRow],
    fallback_date: &str,
) -> Vec<AttendanceRecord> {
    rows.iter()
        .filter_map(|row| {
            let student = match_student(roster, &row.name)?;
            let date = if row.date.trim().is_empty() {
                fallback_date.to_string()
            } else {
                row.date.trim().to_string()
            };
            let time_slot = if row.time_slot.trim().is_empty() {
                "N/A".to_string()
            } else {
                row.time_slot.clone()
            };
            Some(AttendanceRecord {
                student_id: student.id.clone(),
                date,
                status: normalize_status(&row.status),
                time_slot,
            })
        })
        .collect()
}
