//! # NoteVault
//!
//! Password-based encryption pipeline for markdown notes and their linked
//! binary media.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        NOTEVAULT                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐   │
//! │  │ ORCHESTRATOR│  │  COMPRESSION │  │ CHUNK TRANSFORM │   │
//! │  │  per-note   │→ │  + BACKUPS   │→ │ framed AES-GCM  │   │
//! │  └──────┬──────┘  └──────────────┘  └────────┬────────┘   │
//! │         │                                    │            │
//! │  ┌──────┴────────────────────────────────────┴─────────┐  │
//! │  │        CIPHER PRIMITIVE (PBKDF2 → AES-256-GCM)      │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                                                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐   │
//! │  │  SETTINGS   │  │  RETENTION   │  │  STORE TRAITS   │   │
//! │  │  (records)  │  │   POLICY     │  │  + LocalStore   │   │
//! │  └─────────────┘  └──────────────┘  └─────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security model
//!
//! - Note bodies sealed as `<verify-hash>%<hex nonce>:<hex ciphertext>`
//! - Resources sealed as length-prefixed envelope frames, one per chunk
//! - Keys derived per password with PBKDF2-HMAC-SHA256, zeroized on drop
//! - Fresh random nonce per envelope; the deterministic variant is used
//!   only for the password verify-hash
//! - Resource writes commit via temp-file-then-rename, so a failed pass
//!   never leaves a half-transformed file in place

pub mod compress;
pub mod crypto;
pub mod error;
pub mod links;
pub mod resource;
pub mod retention;
pub mod settings;
pub mod store;
pub mod vault;

pub use crypto::cipher::PasswordCipher;
pub use error::{VaultError, VaultResult};
pub use retention::{RetentionMode, SessionPasswords};
pub use settings::{NoteRecord, SettingsRepository, VaultOptions};
pub use store::{BinaryStore, LocalStore, LogNotifier, Notifier, TextStore};
pub use vault::NoteVault;

/// NoteVault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
