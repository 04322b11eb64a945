//! NoteVault - Password Retention Policy
//!
//! Governs whether and where a note's password is cached after an operation:
//! never, for the process lifetime only, or persisted in settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::settings::SettingsRepository;

/// Password retention mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetentionMode {
    /// Ask every time; nothing is cached anywhere
    Never,
    /// Cache in process-lifetime memory only; cleared on restart
    SessionOnly,
    /// Write into the per-note settings record; survives restart
    Persisted,
}

impl RetentionMode {
    /// Apply this mode's handler after a successful note operation.
    pub fn retain(
        self,
        note_path: &str,
        password: &str,
        session: &mut SessionPasswords,
        settings: &mut SettingsRepository,
    ) {
        match self {
            RetentionMode::Never => {
                session.forget(note_path);
                settings.blank_password(note_path);
            }
            RetentionMode::SessionOnly => {
                session.remember(note_path, password);
                settings.blank_password(note_path);
            }
            RetentionMode::Persisted => {
                session.forget(note_path);
                settings.set_password(note_path, password);
            }
        }
    }
}

/// Recall the password previously on record for a note, checking the
/// persisted record first and then the session cache.
pub fn recall(
    note_path: &str,
    session: &SessionPasswords,
    settings: &SettingsRepository,
) -> Option<String> {
    if let Some(record) = settings.record(note_path) {
        if !record.pass.is_empty() {
            return Some(record.pass.clone());
        }
    }
    session.recall(note_path).map(str::to_string)
}

/// Process-lifetime password cache keyed by note path.
#[derive(Default)]
pub struct SessionPasswords {
    map: HashMap<String, String>,
}

impl SessionPasswords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, note_path: &str, password: &str) {
        self.map
            .insert(note_path.to_string(), password.to_string());
    }

    pub fn recall(&self, note_path: &str) -> Option<&str> {
        self.map.get(note_path).map(String::as_str)
    }

    pub fn forget(&mut self, note_path: &str) {
        self.map.remove(note_path);
    }
}
