//! NoteVault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("authentication failed - password may be incorrect: {0}")]
    Authentication(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    // ═══════════════════════════════════════════════════════════════
    // PIPELINE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("resource may be corrupted or moved: {0}")]
    ResourceCorrupted(String),

    #[error("password conflicts with compression policy: {0}")]
    PolicyConflict(String),

    // ═══════════════════════════════════════════════════════════════
    // FILE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // SERIALIZATION / IMAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl VaultError {
    /// Check whether this error must abort the whole note operation
    /// rather than just the resource being processed.
    pub fn aborts_operation(&self) -> bool {
        matches!(
            self,
            VaultError::Authentication(_) | VaultError::PolicyConflict(_)
        )
    }
}
