//! NoteVault - Settings Repository
//!
//! Per-note encryption records and global options, persisted as one JSON
//! file with an explicit load/save lifecycle. The repository is passed by
//! reference to the orchestrator; there is no ambient singleton.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultResult;
use crate::resource::MIN_CHUNK_SIZE;
use crate::retention::RetentionMode;

/// Global pipeline options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultOptions {
    /// Recompress images before encryption
    pub compress_images: bool,
    /// Encrypt linked video resources too (images are always included)
    pub encrypt_videos: bool,
    /// Password retention mode
    pub retention: RetentionMode,
    /// Target upper bound for compressed image size, in bytes
    pub max_compressed_bytes: usize,
    /// Dimension cap applied during compression
    pub max_dimension: u32,
    /// Height/width ratio at or above which an image counts as a long
    /// screenshot and skips the dimension cap
    pub long_screenshot_ratio: f32,
    /// Configured chunk size; read through [`VaultOptions::chunk_size`]
    chunk_size: usize,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            compress_images: false,
            encrypt_videos: false,
            retention: RetentionMode::SessionOnly,
            max_compressed_bytes: 512 * 1024,
            max_dimension: 1920,
            long_screenshot_ratio: 3.0,
            chunk_size: MIN_CHUNK_SIZE,
        }
    }
}

impl VaultOptions {
    /// Effective chunk size, clamped to the 1 MiB minimum.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(MIN_CHUNK_SIZE)
    }

    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }
}

/// Per-note encryption record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Retained password; empty unless the retention mode is `Persisted`
    pub pass: String,
    /// Resource paths linked from the note at encryption time
    pub links: Vec<String>,
    /// When the note was last encrypted
    pub encrypted_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsData {
    options: VaultOptions,
    records: HashMap<String, NoteRecord>,
}

/// Settings store with an explicit load/save lifecycle.
pub struct SettingsRepository {
    path: PathBuf,
    data: SettingsData,
}

impl SettingsRepository {
    /// Load settings from a JSON file; a missing file yields defaults.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let data = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            SettingsData::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Persist the current state back to the settings file.
    pub fn save(&self) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }

    pub fn options(&self) -> &VaultOptions {
        &self.data.options
    }

    pub fn options_mut(&mut self) -> &mut VaultOptions {
        &mut self.data.options
    }

    /// Look up the record for a note path.
    pub fn record(&self, note_path: &str) -> Option<&NoteRecord> {
        self.data.records.get(note_path)
    }

    /// Create or replace the record for a note.
    pub fn upsert_record(&mut self, note_path: &str, pass: &str, links: Vec<String>) {
        self.data.records.insert(
            note_path.to_string(),
            NoteRecord {
                pass: pass.to_string(),
                links,
                encrypted_at: Utc::now(),
            },
        );
    }

    /// Overwrite the retained password on an existing record.
    pub fn set_password(&mut self, note_path: &str, pass: &str) {
        if let Some(record) = self.data.records.get_mut(note_path) {
            record.pass = pass.to_string();
        }
    }

    /// Blank the retained password on an existing record, keeping the rest.
    pub fn blank_password(&mut self, note_path: &str) {
        self.set_password(note_path, "");
    }

    /// Blank every persisted password. Called when the retention mode is not
    /// `Persisted`, so stale secrets do not linger in the settings file.
    pub fn blank_all_passwords(&mut self) {
        for record in self.data.records.values_mut() {
            record.pass.clear();
        }
    }

    /// Drop records whose note no longer exists.
    pub fn prune_stale(&mut self, exists: impl Fn(&str) -> bool) {
        self.data.records.retain(|path, _| exists(path));
    }

    pub fn record_count(&self) -> usize {
        self.data.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let repo = SettingsRepository::load(&dir.path().join("settings.json")).unwrap();

        assert!(!repo.options().compress_images);
        assert_eq!(repo.options().chunk_size(), MIN_CHUNK_SIZE);
        assert_eq!(repo.record_count(), 0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut repo = SettingsRepository::load(&path).unwrap();
        repo.options_mut().compress_images = true;
        repo.upsert_record("a.md", "123", vec!["1.jpg".into(), "2.png".into()]);
        repo.save().unwrap();

        let reloaded = SettingsRepository::load(&path).unwrap();
        assert!(reloaded.options().compress_images);
        let record = reloaded.record("a.md").unwrap();
        assert_eq!(record.pass, "123");
        assert_eq!(record.links, vec!["1.jpg", "2.png"]);
    }

    #[test]
    fn test_chunk_size_clamped() {
        let dir = tempdir().unwrap();
        let mut repo = SettingsRepository::load(&dir.path().join("s.json")).unwrap();

        repo.options_mut().set_chunk_size(16);
        assert_eq!(repo.options().chunk_size(), MIN_CHUNK_SIZE);

        repo.options_mut().set_chunk_size(4 * MIN_CHUNK_SIZE);
        assert_eq!(repo.options().chunk_size(), 4 * MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_prune_and_blank() {
        let dir = tempdir().unwrap();
        let mut repo = SettingsRepository::load(&dir.path().join("s.json")).unwrap();

        repo.upsert_record("keep.md", "pw1", vec![]);
        repo.upsert_record("gone.md", "pw2", vec![]);

        repo.prune_stale(|path| path == "keep.md");
        assert_eq!(repo.record_count(), 1);
        assert!(repo.record("gone.md").is_none());

        repo.blank_all_passwords();
        assert_eq!(repo.record("keep.md").unwrap().pass, "");
    }
}
