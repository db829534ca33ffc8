use anyhow::Context;
use std::path::{Path, PathBuf};

pub const STUDENTS_KEY: &str = "art_students";
pub const ATTENDANCE_KEY: &str = "art_attendance";
pub const SETTINGS_KEY: &str = "art_settings";

/// Key/value store over a workspace directory. Each key is one JSON document
/// at `<workspace>/<key>.json`, mirroring the browser localStorage keys the
/// app format was defined around. Writes are write-through and atomic.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(workspace: &Path) -> anyhow::Result<LocalStore> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!("failed to create workspace {}", workspace.to_string_lossy())
        })?;
        Ok(LocalStore {
            root: workspace.to_path_buf(),
        })
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        Ok(Some(text))
    }

    /// Writes go to a sibling temp file first, then rename over the key so a
    /// crash mid-write never leaves a truncated document behind.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.key_path(key);
        let tmp = self.root.join(format!("{key}.json.writing"));
        std::fs::write(&tmp, value)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &path).with_context(|| {
            format!("failed to install {} over {}", tmp.to_string_lossy(), path.to_string_lossy())
        })?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.key_path(key);
        if path.is_file() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.to_string_lossy()))?;
        }
        Ok(())
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            None => Ok(None),
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("stored key {key} is not valid JSON"))?;
                Ok(Some(value))
            }
        }
    }

    pub fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize key {key}"))?;
        self.set(key, &text)
    }
}
