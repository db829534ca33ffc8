use serde::{Deserialize, Serialize};

/// Wire and storage formats are camelCase with UPPERCASE enum values so the
/// JSON matches what the spreadsheet-side scripts already expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Lelaki,
    Perempuan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtsField {
    Muzik,
    Visual,
    Tari,
    Teater,
}

impl ArtsField {
    pub const ALL: [ArtsField; 4] = [
        ArtsField::Muzik,
        ArtsField::Visual,
        ArtsField::Tari,
        ArtsField::Teater,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtsField::Muzik => "MUZIK",
            ArtsField::Visual => "VISUAL",
            ArtsField::Tari => "TARI",
            ArtsField::Teater => "TEATER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub group: String,
    pub form: String,
    pub field: ArtsField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Natural key: (studentId, date, timeSlot). The attendance book guarantees
/// at most one record per key after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    /// Local calendar date, "YYYY-MM-DD".
    pub date: String,
    pub status: AttendanceStatus,
    pub time_slot: String,
}

impl AttendanceRecord {
    pub fn key(&self) -> (String, String, String) {
        (
            self.student_id.clone(),
            self.date.clone(),
            self.time_slot.clone(),
        )
    }
}

/// Denormalized row as returned by the archive's `search_attendance` action.
/// The remote sheet has no stable ids, so every column is a free-form string
/// and absent columns default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRow {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub time_slot: String,
    #[serde(default)]
    pub coach_name: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

/// Workspace-level configuration persisted under the `art_settings` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_name: Option<String>,
}

/// Student ids are millisecond timestamps kept unique by bumping while a
/// collision exists (bulk imports allocate many ids inside one tick).
pub fn next_student_id(roster: &[Student]) -> String {
    let mut candidate = chrono::Utc::now().timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !roster.iter().any(|s| s.id == id) {
            return id;
        }
        candidate += 1;
    }
}

/// Fallback roster used when a workspace has no `art_students` document yet.
pub fn seed_roster() -> Vec<Student> {
    fn student(
        id: &str,
        name: &str,
        gender: Gender,
        group: &str,
        form: &str,
        field: ArtsField,
    ) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            group: group.to_string(),
            form: form.to_string(),
            field,
            role: None,
            notes: None,
        }
    }

    vec![
        student("1", "AHMAD FAIZ BIN KAMARUL", Gender::Lelaki, "1 GAMELAN", "1 AMANAH", ArtsField::Muzik),
        student("2", "NUR AISYAH BINTI RAHMAN", Gender::Perempuan, "1 GAMELAN", "1 BESTARI", ArtsField::Muzik),
        student("3", "LIM WEI JIE", Gender::Lelaki, "2 CATAN", "2 AMANAH", ArtsField::Visual),
        student("4", "SITI MARIAM BINTI YUSOF", Gender::Perempuan, "2 CATAN", "2 CEKAL", ArtsField::Visual),
        student("5", "MUHAMMAD DANIAL BIN AZLAN", Gender::Lelaki, "3 ZAPIN", "3 AMANAH", ArtsField::Tari),
        student("6", "PRIYA A/P SUBRAMANIAM", Gender::Perempuan, "3 ZAPIN", "3 BESTARI", ArtsField::Tari),
        student("7", "MOHD HAFIZ BIN OSMAN", Gender::Lelaki, "4 PENTAS", "4 AMANAH", ArtsField::Teater),
        student("8", "TAN MEI LING", Gender::Perempuan, "4 PENTAS", "4 CEKAL", ArtsField::Teater),
    ]
}
