use crate::model::{AttendanceRecord, AttendanceStatus};
use std::collections::HashSet;

/// Snapshots kept for undo. Once full, the oldest snapshot is silently
/// dropped; nothing is surfaced to the caller.
pub const HISTORY_DEPTH: usize = 20;

/// In-memory attendance list plus its undo history.
///
/// Every mutating operation first pushes a full snapshot of the current list,
/// then rewrites the list so that at most one record exists per
/// (studentId, date, timeSlot) key. Undo is single-step: each call restores
/// exactly the snapshot taken before the most recent mutation.
#[derive(Debug, Default, Clone)]
pub struct AttendanceBook {
    records: Vec<AttendanceRecord>,
    history: Vec<Vec<AttendanceRecord>>,
}

impl AttendanceBook {
    pub fn from_records(records: Vec<AttendanceRecord>) -> AttendanceBook {
        AttendanceBook {
            records,
            history: Vec::new(),
        }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn snapshot(&mut self) {
        if self.history.len() >= HISTORY_DEPTH {
            let overflow = self.history.len() - (HISTORY_DEPTH - 1);
            self.history.drain(0..overflow);
        }
        self.history.push(self.records.clone());
    }

    /// Replaces any record for (studentId, date, timeSlot) with the new
    /// status: filter out the key, then append.
    pub fn mark(&mut self, student_id: &str, date: &str, status: AttendanceStatus, time_slot: &str) {
        self.snapshot();
        self.records.retain(|r| {
            !(r.student_id == student_id && r.date == date && r.time_slot == time_slot)
        });
        self.records.push(AttendanceRecord {
            student_id: student_id.to_string(),
            date: date.to_string(),
            status,
            time_slot: time_slot.to_string(),
        });
    }

    /// One snapshot, one replace for the whole set ("mark all present").
    pub fn bulk_mark(
        &mut self,
        updates: &[(String, AttendanceStatus)],
        date: &str,
        time_slot: &str,
    ) {
        self.snapshot();
        let ids: HashSet<&str> = updates.iter().map(|(id, _)| id.as_str()).collect();
        self.records.retain(|r| {
            !(ids.contains(r.student_id.as_str()) && r.date == date && r.time_slot == time_slot)
        });
        for (student_id, status) in updates {
            self.records.push(AttendanceRecord {
                student_id: student_id.clone(),
                date: date.to_string(),
                status: *status,
                time_slot: time_slot.to_string(),
            });
        }
    }

    /// Removes the given students' records for one session.
    pub fn clear(&mut self, student_ids: &[String], date: &str, time_slot: &str) {
        self.snapshot();
        let ids: HashSet<&str> = student_ids.iter().map(String::as_str).collect();
        self.records.retain(|r| {
            !(ids.contains(r.student_id.as_str()) && r.date == date && r.time_slot == time_slot)
        });
    }

    /// Empties the list and erases history. The caller owns the confirmation
    /// gate and the storage-key removal.
    pub fn clear_all(&mut self) {
        self.records.clear();
        self.history.clear();
    }

    /// Pops the latest snapshot into place. Returns false with empty history.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                self.records = prev;
                true
            }
            None => false,
        }
    }

    /// Wholesale overwrite of one date: drop every local record carrying that
    /// exact date, then append the pulled set. Does not touch history; a
    /// cloud refresh is not an undoable edit.
    pub fn replace_date(&mut self, date: &str, pulled: Vec<AttendanceRecord>) {
        self.records.retain(|r| r.date != date);
        self.records.extend(pulled);
    }

    /// Keyed merge used by range fetches: records whose
    /// (studentId, date, timeSlot) already exists locally are dropped, as are
    /// duplicates inside the incoming batch (first occurrence wins). Returns
    /// how many records were appended. Idempotent.
    pub fn merge(&mut self, incoming: Vec<AttendanceRecord>) -> usize {
        let mut seen: HashSet<(String, String, String)> =
            self.records.iter().map(AttendanceRecord::key).collect();
        let mut added = 0;
        for rec in incoming {
            if seen.insert(rec.key()) {
                self.records.push(rec);
                added += 1;
            }
        }
        added
    }

    pub fn session_records(&self, date: &str, time_slot: &str) -> Vec<AttendanceRecord> {
        self.records
            .iter()
            .filter(|r| r.date == date && r.time_slot == time_slot)
            .cloned()
            .collect()
    }
}
