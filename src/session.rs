use crate::attendance::AttendanceBook;
use crate::model::{seed_roster, ArchiveRow, AttendanceRecord, Settings, Student};
use crate::store::{LocalStore, ATTENDANCE_KEY, SETTINGS_KEY, STUDENTS_KEY};
use crate::sync::WebhookClient;
use anyhow::anyhow;
use std::path::Path;

/// Everything owned by one open workspace: the store, the roster, the
/// attendance book with its undo history, settings, and the cached archive
/// search results used for optimistic delete bookkeeping.
pub struct Session {
    store: LocalStore,
    pub roster: Vec<Student>,
    pub book: AttendanceBook,
    pub settings: Settings,
    pub archive_cache: Vec<ArchiveRow>,
}

impl Session {
    /// Loads persisted state, falling back to the seed roster (persisted on
    /// the spot, so the workspace is self-describing from the first open)
    /// and an empty attendance list.
    pub fn open(workspace: &Path) -> anyhow::Result<Session> {
        let store = LocalStore::open(workspace)?;
        let roster = match store.get_json::<Vec<Student>>(STUDENTS_KEY)? {
            Some(roster) => roster,
            None => {
                let seeded = seed_roster();
                store.set_json(STUDENTS_KEY, &seeded)?;
                seeded
            }
        };
        let records = store
            .get_json::<Vec<AttendanceRecord>>(ATTENDANCE_KEY)?
            .unwrap_or_default();
        let settings = store.get_json::<Settings>(SETTINGS_KEY)?.unwrap_or_default();
        Ok(Session {
            store,
            roster,
            book: AttendanceBook::from_records(records),
            settings,
            archive_cache: Vec::new(),
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn persist_roster(&self) -> anyhow::Result<()> {
        self.store.set_json(STUDENTS_KEY, &self.roster)
    }

    pub fn persist_attendance(&self) -> anyhow::Result<()> {
        self.store.set_json(ATTENDANCE_KEY, &self.book.records())
    }

    pub fn persist_settings(&self) -> anyhow::Result<()> {
        self.store.set_json(SETTINGS_KEY, &self.settings)
    }

    pub fn drop_attendance_key(&self) -> anyhow::Result<()> {
        self.store.remove(ATTENDANCE_KEY)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.roster.iter().find(|s| s.id == id)
    }

    pub fn webhook(&self) -> anyhow::Result<WebhookClient> {
        let endpoint = self
            .settings
            .endpoint_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("no endpoint configured"))?;
        WebhookClient::new(endpoint, self.settings.spreadsheet_id.as_deref())
    }
}
