//! NoteVault - Store Interfaces & Local Filesystem Implementation
//!
//! The pipeline only ever talks to these traits; the host application's
//! document/vault model plugs in behind them.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};

/// Binary read/write interface for named resources
pub trait BinaryStore {
    fn read_binary(&self, path: &str) -> VaultResult<Vec<u8>>;
    fn write_binary(&self, path: &str, data: &[u8]) -> VaultResult<()>;
    fn exists(&self, path: &str) -> bool;
    fn rename(&self, from: &str, to: &str) -> VaultResult<()>;
    fn delete(&self, path: &str) -> VaultResult<()>;
}

/// Text read/modify interface for notes
pub trait TextStore {
    fn read_text(&self, path: &str) -> VaultResult<String>;
    fn modify(&self, path: &str, content: &str) -> VaultResult<()>;
    fn create(&self, path: &str, content: &str) -> VaultResult<()>;
}

/// Fire-and-forget user-facing message sink
pub trait Notifier {
    fn notify(&self, message: &str);
    fn progress(&self, percent: u8);
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// Filesystem-backed store rooted at a directory.
///
/// Writes go to a temporary sibling first and are renamed into place only
/// once complete, so a crash mid-write never leaves a half-written file at
/// the canonical path.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn full_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn write_atomic(&self, relative: &str, data: &[u8]) -> VaultResult<()> {
        let path = self.full_path(relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;

        // Rename to final path (atomic on most filesystems)
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

impl BinaryStore for LocalStore {
    fn read_binary(&self, path: &str) -> VaultResult<Vec<u8>> {
        let full = self.full_path(path);
        if !full.exists() {
            return Err(VaultError::FileNotFound(path.to_string()));
        }
        Ok(fs::read(&full)?)
    }

    fn write_binary(&self, path: &str, data: &[u8]) -> VaultResult<()> {
        self.write_atomic(path, data)
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    fn rename(&self, from: &str, to: &str) -> VaultResult<()> {
        let src = self.full_path(from);
        if !src.exists() {
            return Err(VaultError::FileNotFound(from.to_string()));
        }
        Ok(fs::rename(src, self.full_path(to))?)
    }

    fn delete(&self, path: &str) -> VaultResult<()> {
        let full = self.full_path(path);
        if full.exists() {
            fs::remove_file(full)?;
        }
        Ok(())
    }
}

impl TextStore for LocalStore {
    fn read_text(&self, path: &str) -> VaultResult<String> {
        let full = self.full_path(path);
        if !full.exists() {
            return Err(VaultError::FileNotFound(path.to_string()));
        }
        Ok(fs::read_to_string(&full)?)
    }

    fn modify(&self, path: &str, content: &str) -> VaultResult<()> {
        self.write_atomic(path, content.as_bytes())
    }

    fn create(&self, path: &str, content: &str) -> VaultResult<()> {
        if self.exists(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{path} already exists"),
            )
            .into());
        }
        self.write_atomic(path, content.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Notifier that routes user-facing messages through the log facade.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::info!("{message}");
    }

    fn progress(&self, percent: u8) {
        log::debug!("progress: {percent}%");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_store_binary() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.write_binary("media/1.jpg", b"image bytes").unwrap();
        assert!(store.exists("media/1.jpg"));
        assert_eq!(store.read_binary("media/1.jpg").unwrap(), b"image bytes");

        store.rename("media/1.jpg", "media/2.jpg").unwrap();
        assert!(!store.exists("media/1.jpg"));

        store.delete("media/2.jpg").unwrap();
        assert!(!store.exists("media/2.jpg"));
    }

    #[test]
    fn test_local_store_text() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.create("note.md", "hello").unwrap();
        assert_eq!(store.read_text("note.md").unwrap(), "hello");
        assert!(store.create("note.md", "again").is_err());

        store.modify("note.md", "changed").unwrap();
        assert_eq!(store.read_text("note.md").unwrap(), "changed");
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(matches!(
            store.read_binary("nope.bin"),
            Err(VaultError::FileNotFound(_))
        ));
        assert!(matches!(
            store.read_text("nope.md"),
            Err(VaultError::FileNotFound(_))
        ));
        assert!(matches!(
            BinaryStore::rename(&store, "nope", "other"),
            Err(VaultError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.write_binary("a.bin", &[1, 2, 3]).unwrap();
        assert!(!dir.path().join("a.tmp").exists());
    }
}
