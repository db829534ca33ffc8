use crate::model::{ArtsField, AttendanceRecord, AttendanceStatus, Student};
use anyhow::{anyhow, Context};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

/// Daily expansion is bounded regardless of the requested span.
pub const MAX_EXPANDED_DAYS: usize = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn parse(s: &str) -> Option<Granularity> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Some(Granularity::Daily),
            "WEEKLY" => Some(Granularity::Weekly),
            "MONTHLY" => Some(Granularity::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    /// "2024-01-05" for days, "2024-W02" for ISO weeks, "2024-01" for months.
    pub key: String,
    pub days: usize,
    pub present_count: i64,
    pub absent_count: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRate {
    pub field: ArtsField,
    pub student_count: usize,
    pub present_count: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub average_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_key: Option<String>,
    pub total_students: usize,
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date: {s}"))
}

pub fn parse_range(start: &str, end: &str) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        return Err(anyhow!("startDate is after endDate"));
    }
    Ok((start, end))
}

pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> usize {
    (end - start).num_days() as usize + 1
}

/// 1-decimal rounding used for the report percentages.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

struct DayStat {
    date: NaiveDate,
    present: i64,
}

fn expand_days(
    start: NaiveDate,
    end: NaiveDate,
    records: &[AttendanceRecord],
) -> Vec<DayStat> {
    let span = days_in_range(start, end).min(MAX_EXPANDED_DAYS);
    (0..span)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let date_str = date.format("%Y-%m-%d").to_string();
            let present = records
                .iter()
                .filter(|r| r.date == date_str && r.status == AttendanceStatus::Present)
                .count() as i64;
            DayStat { date, present }
        })
        .collect()
}

/// Buckets the date range into attendance-rate statistics. Reads only; the
/// stores are never touched. Empty roster or empty bucket rates come out as
/// 0, never NaN.
pub fn trend(
    roster: &[Student],
    records: &[AttendanceRecord],
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Vec<TrendBucket> {
    let total_students = roster.len() as i64;
    let daily = expand_days(start, end, records);

    match granularity {
        Granularity::Daily => daily
            .iter()
            .map(|d| {
                let rate = if total_students > 0 {
                    d.present as f64 / total_students as f64 * 100.0
                } else {
                    0.0
                };
                TrendBucket {
                    key: d.date.format("%Y-%m-%d").to_string(),
                    days: 1,
                    present_count: d.present,
                    absent_count: total_students - d.present,
                    rate,
                }
            })
            .collect(),
        Granularity::Weekly => {
            // ISO-8601 numbering: Monday-start, the week holding the year's
            // first Thursday is week 1. Keys pair the week with its ISO year.
            rollup(&daily, total_students, |d| {
                let iso = d.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            })
        }
        Granularity::Monthly => rollup(&daily, total_students, |d| format!("{}-{:02}", d.year(), d.month())),
    }
}

fn rollup(
    daily: &[DayStat],
    total_students: i64,
    key_of: impl Fn(NaiveDate) -> String,
) -> Vec<TrendBucket> {
    let mut buckets: Vec<TrendBucket> = Vec::new();
    for d in daily {
        let key = key_of(d.date);
        match buckets.last_mut() {
            Some(b) if b.key == key => {
                b.days += 1;
                b.present_count += d.present;
            }
            _ => buckets.push(TrendBucket {
                key,
                days: 1,
                present_count: d.present,
                absent_count: 0,
                rate: 0.0,
            }),
        }
    }
    for b in &mut buckets {
        let total_student_days = total_students * b.days as i64;
        b.rate = if total_student_days > 0 {
            b.present_count as f64 / total_student_days as f64 * 100.0
        } else {
            0.0
        };
        let mean = (b.present_count as f64 / b.days as f64).round() as i64;
        b.present_count = mean;
        b.absent_count = (total_students - mean).max(0);
    }
    buckets
}

/// Per-field attendance rate over the range:
/// present / (studentsInField * daysInRange) * 100, to one decimal.
/// The day count here is the raw inclusive span, not the capped expansion.
pub fn field_rates(
    roster: &[Student],
    records: &[AttendanceRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<FieldRate> {
    let start_str = start.format("%Y-%m-%d").to_string();
    let end_str = end.format("%Y-%m-%d").to_string();
    let days = days_in_range(start, end);

    ArtsField::ALL
        .iter()
        .map(|&field| {
            let ids: HashSet<&str> = roster
                .iter()
                .filter(|s| s.field == field)
                .map(|s| s.id.as_str())
                .collect();
            let present_count = records
                .iter()
                .filter(|r| {
                    ids.contains(r.student_id.as_str())
                        && r.status == AttendanceStatus::Present
                        && r.date.as_str() >= start_str.as_str()
                        && r.date.as_str() <= end_str.as_str()
                })
                .count();
            let potential = ids.len() * days;
            let rate = if potential > 0 {
                round1(present_count as f64 / potential as f64 * 100.0)
            } else {
                0.0
            };
            FieldRate {
                field,
                student_count: ids.len(),
                present_count,
                rate,
            }
        })
        .collect()
}

/// Headline numbers for the summary view: mean bucket rate and the bucket
/// with the highest present count (None when nothing was present at all).
pub fn overview(roster: &[Student], buckets: &[TrendBucket]) -> Overview {
    let average_rate = if buckets.is_empty() {
        0.0
    } else {
        round1(buckets.iter().map(|b| b.rate).sum::<f64>() / buckets.len() as f64)
    };
    let peak_key = buckets
        .iter()
        .filter(|b| b.present_count > 0)
        .max_by_key(|b| b.present_count)
        .map(|b| b.key.clone());
    Overview {
        average_rate,
        peak_key,
        total_students: roster.len(),
    }
}
