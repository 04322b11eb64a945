//! NoteVault - Encryption Orchestrator
//!
//! Drives the per-note workflow: detect state, collect resource links,
//! transform each resource through the compression and chunk layers, rewrite
//! the note body and persist the bookkeeping record.

use std::path::Path;

use crate::compress::{backup_path, is_backup_path, is_image, is_video, BackupManager};
use crate::crypto::cipher::PasswordCipher;
use crate::error::{VaultError, VaultResult};
use crate::links::extract_links;
use crate::resource::{
    decrypt_resource, encrypt_resource, is_encrypted_note_body, open_note_body, seal_note_body,
    Transform,
};
use crate::retention::{self, SessionPasswords};
use crate::settings::SettingsRepository;
use crate::store::{BinaryStore, LocalStore, LogNotifier, Notifier, TextStore};

/// Settings file name used by [`NoteVault::open`]
pub const SETTINGS_FILE: &str = ".notevault.json";

/// Note encryption orchestrator.
///
/// Resources are processed strictly sequentially: one resource's full chunk
/// loop completes before the next starts, which bounds peak memory and keeps
/// progress reporting monotonic.
pub struct NoteVault<S: BinaryStore + TextStore> {
    store: S,
    settings: SettingsRepository,
    session: SessionPasswords,
    notifier: Box<dyn Notifier>,
}

impl NoteVault<LocalStore> {
    /// Open a vault rooted at a directory, with settings stored alongside.
    pub fn open(root: &Path) -> VaultResult<Self> {
        Ok(Self::new(
            LocalStore::new(root),
            SettingsRepository::load(&root.join(SETTINGS_FILE))?,
            Box::new(LogNotifier),
        ))
    }
}

impl<S: BinaryStore + TextStore> NoteVault<S> {
    pub fn new(store: S, settings: SettingsRepository, notifier: Box<dyn Notifier>) -> Self {
        Self {
            store,
            settings,
            session: SessionPasswords::new(),
            notifier,
        }
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsRepository {
        &mut self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Derived note state, detected from the body's content prefix.
    pub fn is_note_encrypted(&self, note_path: &str) -> VaultResult<bool> {
        Ok(is_encrypted_note_body(&self.store.read_text(note_path)?))
    }

    /// Encrypt or decrypt depending on the note's current state.
    pub fn toggle_note(&mut self, note_path: &str, password: &str) -> VaultResult<()> {
        if self.is_note_encrypted(note_path)? {
            self.decrypt_note(note_path, password)
        } else {
            self.encrypt_note(note_path, password)
        }
    }

    /// Housekeeping hook for note-open events: prune records whose note no
    /// longer exists, and blank persisted passwords unless the retention
    /// mode keeps them.
    pub fn on_note_open(&mut self) -> VaultResult<()> {
        let store = &self.store;
        self.settings.prune_stale(|path| store.exists(path));

        if self.settings.options().retention != crate::retention::RetentionMode::Persisted {
            self.settings.blank_all_passwords();
        }
        self.settings.save()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ENCRYPT
    // ═══════════════════════════════════════════════════════════════════════

    pub fn encrypt_note(&mut self, note_path: &str, password: &str) -> VaultResult<()> {
        let body = self.store.read_text(note_path)?;

        if is_encrypted_note_body(&body) {
            self.notifier.notify(&format!("{note_path} is already encrypted"));
            return Ok(());
        }
        // An empty body would seal to a bare `<hash>%` marker that the
        // detection predicate cannot recognize on the way back.
        if body.is_empty() {
            self.notifier.notify(&format!("{note_path} is empty - nothing changed"));
            return Ok(());
        }
        if password.is_empty() {
            self.notifier.notify("empty password - nothing changed");
            return Ok(());
        }

        self.check_compression_policy(note_path, password)?;

        let links = self.qualifying_links(&body);
        let cipher = PasswordCipher::new(password);

        let mut failures = 0usize;
        for link in &links {
            if let Err(e) = self.encrypt_resource_at(link, &cipher, false) {
                if e.aborts_operation() {
                    return Err(e);
                }
                failures += 1;
                self.notifier.notify(&format!("skipping {link}: {e}"));
                log::warn!("failed to encrypt resource {link}: {e}");
            }
        }

        let sealed = seal_note_body(&body, &cipher)?;
        self.store.modify(note_path, &sealed)?;

        self.settings.upsert_record(note_path, "", links);
        let retention = self.settings.options().retention;
        retention.retain(note_path, password, &mut self.session, &mut self.settings);
        self.settings.save()?;

        if failures > 0 {
            self.notifier.notify(&format!(
                "{failures} resource(s) could not be encrypted and may be corrupted or moved"
            ));
        }
        log::info!("encrypted {note_path} ({failures} resource failures)");
        Ok(())
    }

    /// Refuse a password change while compression is on and another password
    /// is on record: the compressed file and its backup would end up sealed
    /// under different passwords with no way back.
    fn check_compression_policy(&self, note_path: &str, password: &str) -> VaultResult<()> {
        if !self.settings.options().compress_images {
            return Ok(());
        }
        match retention::recall(note_path, &self.session, &self.settings) {
            Some(old) if !old.is_empty() && old != password => Err(VaultError::PolicyConflict(
                "a different password is on record for this note; disable compression and \
                 recover with the old password first"
                    .into(),
            )),
            _ => Ok(()),
        }
    }

    fn encrypt_resource_at(
        &self,
        path: &str,
        cipher: &PasswordCipher,
        skip_compression: bool,
    ) -> VaultResult<()> {
        if !self.store.exists(path) {
            return Err(VaultError::FileNotFound(path.to_string()));
        }

        let options = self.settings.options().clone();
        let backups = BackupManager::new(&self.store);
        let mut data = self.store.read_binary(path)?;

        // Backup files are never compressed themselves; compressing one
        // would cascade into backups of backups.
        if is_image(path) && !skip_compression && !is_backup_path(path) {
            if options.compress_images {
                if !backups.has_backup(path)
                    && !crate::resource::is_encrypted_resource_data(&data)
                {
                    data = backups.compress_to_backup(path, &data, &options)?;
                    // The untouched original must be sealed at rest too.
                    self.encrypt_resource_at(&backup_path(path), cipher, true)?;
                }
            } else if backups.restore_backup_if_present(path)? {
                data = self.store.read_binary(path)?;
            }
        }

        let transformed = encrypt_resource(&data, cipher, options.chunk_size(), |done, total| {
            self.notifier.progress(percentage(done, total));
        })?;

        match transformed {
            Transform::Done(out) => self.store.write_binary(path, &out),
            Transform::AlreadyInState => {
                self.notifier.notify(&format!("{path} is already encrypted"));
                Ok(())
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DECRYPT
    // ═══════════════════════════════════════════════════════════════════════

    pub fn decrypt_note(&mut self, note_path: &str, password: &str) -> VaultResult<()> {
        let body = self.store.read_text(note_path)?;

        if !is_encrypted_note_body(&body) {
            self.notifier.notify(&format!("{note_path} is already plaintext"));
            return Ok(());
        }
        if password.is_empty() {
            self.notifier.notify("empty password - nothing changed");
            return Ok(());
        }

        let cipher = PasswordCipher::new(password);

        // Verifies the hash prefix before any mutation; a mismatch aborts
        // with nothing touched.
        let plain = open_note_body(&body, &cipher)?;

        // Links were recorded at encryption time; link resolution against the
        // encrypted body would come up empty.
        let links = match self.settings.record(note_path) {
            Some(record) => record.links.clone(),
            None => self.qualifying_links(&plain),
        };

        let mut failures = 0usize;
        for link in &links {
            if let Err(e) = self.decrypt_resource_at(link, &cipher) {
                if e.aborts_operation() {
                    return Err(e);
                }
                failures += 1;
                self.notifier.notify(&format!("skipping {link}: {e}"));
                log::warn!("failed to decrypt resource {link}: {e}");
            }
        }

        self.store.modify(note_path, &plain)?;

        let retention = self.settings.options().retention;
        retention.retain(note_path, password, &mut self.session, &mut self.settings);
        self.settings.save()?;

        if failures > 0 {
            self.notifier.notify(&format!(
                "{failures} resource(s) could not be decrypted and may be corrupted or moved"
            ));
        }
        log::info!("decrypted {note_path} ({failures} resource failures)");
        Ok(())
    }

    fn decrypt_resource_at(&self, path: &str, cipher: &PasswordCipher) -> VaultResult<()> {
        let options = self.settings.options().clone();
        let backups = BackupManager::new(&self.store);

        // Compression switched off since encryption: recover the original
        // (still sealed) before decrypting it in place.
        if is_image(path) && !options.compress_images {
            backups.restore_backup_if_present(path)?;
        }

        if !self.store.exists(path) {
            return Err(VaultError::FileNotFound(path.to_string()));
        }
        let data = self.store.read_binary(path)?;

        let transformed = decrypt_resource(&data, cipher, |done, total| {
            self.notifier.progress(percentage(done, total));
        })?;

        match transformed {
            Transform::Done(out) => self.store.write_binary(path, &out),
            Transform::AlreadyInState => {
                self.notifier.notify(&format!("{path} is already plaintext"));
                Ok(())
            }
        }
    }

    /// Resource links that qualify for transformation: images always,
    /// videos only when enabled.
    fn qualifying_links(&self, body: &str) -> Vec<String> {
        let encrypt_videos = self.settings.options().encrypt_videos;
        extract_links(body)
            .into_iter()
            .filter(|link| is_image(link) || (encrypt_videos && is_video(link)))
            .collect()
    }
}

fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((done * 100) / total) as u8
    }
}
