//! NoteVault - Chunked Resource Transform
//!
//! Encrypted resource format:
//! ```text
//! [8 ASCII decimal digits][envelope text bytes] ... repeated per chunk
//! ```
//! The length prefix is the byte length of the envelope that follows, so each
//! chunk decrypts independently and a truncated tail is detectable.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::crypto::cipher::{PasswordCipher, VERIFY_HASH_LEN};
use crate::error::{VaultError, VaultResult};

/// Minimum chunk size for resource encryption (1 MiB)
pub const MIN_CHUNK_SIZE: usize = 1024 * 1024;

/// Width of the decimal length prefix on each frame
pub const FRAME_LEN_DIGITS: usize = 8;

/// Largest envelope a single frame can carry
const MAX_FRAME_LEN: usize = 99_999_999;

/// Outcome of a resource transform
#[derive(Debug)]
pub enum Transform {
    /// Fully transformed output bytes
    Done(Vec<u8>),
    /// Input already was in the requested state; nothing to do
    AlreadyInState,
}

// ---------------------------------------------------------------------------
// Detection predicates
//
// These are heuristic shape checks on raw bytes interpreted as text; a
// coincidentally matching plaintext is a false positive. They are the single
// swap-point for a future magic-byte scheme.
// ---------------------------------------------------------------------------

/// Check that `text` has the `<hex>:<hex>` envelope shape.
pub fn is_envelope(text: &str) -> bool {
    match text.split_once(':') {
        Some((nonce, cipher)) => {
            !nonce.is_empty()
                && !cipher.is_empty()
                && nonce.bytes().all(|b| b.is_ascii_hexdigit())
                && cipher.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Check that raw bytes look like the start of an encrypted resource:
/// an 8-digit decimal length prefix followed by an envelope-shaped frame.
pub fn is_encrypted_resource_data(data: &[u8]) -> bool {
    if data.len() <= FRAME_LEN_DIGITS {
        return false;
    }
    let (prefix, rest) = data.split_at(FRAME_LEN_DIGITS);
    if !prefix.iter().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let len = match std::str::from_utf8(prefix).ok().and_then(|s| s.parse::<usize>().ok()) {
        Some(n) if n > 0 => n,
        _ => return false,
    };
    let frame = &rest[..len.min(rest.len())];
    match std::str::from_utf8(frame) {
        Ok(text) => is_envelope(text),
        Err(_) => false,
    }
}

/// Check that a note body carries the outer encrypted marker:
/// 32 hex chars of password verify-hash, `%`, then an envelope.
pub fn is_encrypted_note_body(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() <= VERIFY_HASH_LEN + 1 {
        return false;
    }
    let (hash, rest) = bytes.split_at(VERIFY_HASH_LEN);
    hash.iter().all(|b| b.is_ascii_hexdigit())
        && rest[0] == b'%'
        && std::str::from_utf8(&rest[1..]).map_or(false, is_envelope)
}

// ---------------------------------------------------------------------------
// Chunked transform
// ---------------------------------------------------------------------------

/// Encrypt resource bytes into length-prefixed envelope frames.
///
/// Each chunk window is tested against the encrypted shape first; a match
/// means the resource is already encrypted and the whole pass is skipped
/// without mutation. `on_progress` receives `(processed, total)` byte counts.
pub fn encrypt_resource(
    data: &[u8],
    cipher: &PasswordCipher,
    chunk_size: usize,
    mut on_progress: impl FnMut(usize, usize),
) -> VaultResult<Transform> {
    let chunk_size = chunk_size.max(1);
    let total = data.len();
    let mut out = Vec::with_capacity(total + total / 2);
    let mut processed = 0usize;

    for chunk in data.chunks(chunk_size) {
        if is_encrypted_resource_data(chunk) {
            return Ok(Transform::AlreadyInState);
        }

        let encoded = STANDARD.encode(chunk);
        let envelope = cipher.encrypt(&encoded)?;
        if envelope.len() > MAX_FRAME_LEN {
            return Err(VaultError::Encryption(format!(
                "chunk envelope of {} bytes overflows the frame length prefix",
                envelope.len()
            )));
        }

        out.extend_from_slice(format!("{:08}", envelope.len()).as_bytes());
        out.extend_from_slice(envelope.as_bytes());

        processed += chunk.len();
        on_progress(processed, total);
    }

    Ok(Transform::Done(out))
}

/// Decrypt length-prefixed envelope frames back into resource bytes.
///
/// A leading section that does not frame-parse means the resource is already
/// plaintext; a malformed frame after a valid one means corruption.
pub fn decrypt_resource(
    data: &[u8],
    cipher: &PasswordCipher,
    mut on_progress: impl FnMut(usize, usize),
) -> VaultResult<Transform> {
    let total = data.len();
    let mut out = Vec::with_capacity(total);
    let mut offset = 0usize;

    while offset < total {
        let first = offset == 0;

        let envelope = match read_frame(data, offset) {
            Some(env) => env,
            None if first => return Ok(Transform::AlreadyInState),
            None => {
                return Err(VaultError::ResourceCorrupted(
                    "malformed chunk frame mid-stream".into(),
                ))
            }
        };
        if !is_envelope(envelope) {
            if first {
                return Ok(Transform::AlreadyInState);
            }
            return Err(VaultError::ResourceCorrupted(
                "frame payload is not an envelope".into(),
            ));
        }

        let encoded = cipher.decrypt(envelope)?;
        let chunk = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| VaultError::ResourceCorrupted(format!("bad base64 chunk: {e}")))?;
        out.extend_from_slice(&chunk);

        offset += FRAME_LEN_DIGITS + envelope.len();
        on_progress(offset.min(total), total);
    }

    Ok(Transform::Done(out))
}

/// Extract one frame's envelope text at `offset`, or `None` if the bytes
/// there do not parse as a complete frame.
fn read_frame(data: &[u8], offset: usize) -> Option<&str> {
    let prefix = data.get(offset..offset + FRAME_LEN_DIGITS)?;
    if !prefix.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let len: usize = std::str::from_utf8(prefix).ok()?.parse().ok()?;
    if len == 0 {
        return None;
    }
    let body = data.get(offset + FRAME_LEN_DIGITS..offset + FRAME_LEN_DIGITS + len)?;
    std::str::from_utf8(body).ok()
}

// ---------------------------------------------------------------------------
// Note body sealing
// ---------------------------------------------------------------------------

/// Wrap a note body: `<verify-hash>%<envelope>`.
pub fn seal_note_body(body: &str, cipher: &PasswordCipher) -> VaultResult<String> {
    Ok(format!("{}%{}", cipher.verify_hash(), cipher.encrypt(body)?))
}

/// Unwrap a sealed note body, verifying the password hash prefix first.
///
/// A hash mismatch fails before any decryption is attempted, so the caller
/// can abort without touching the note.
pub fn open_note_body(sealed: &str, cipher: &PasswordCipher) -> VaultResult<String> {
    let (hash, envelope) = sealed
        .split_once('%')
        .ok_or_else(|| VaultError::InvalidEnvelope("missing note body marker".into()))?;

    if hash != cipher.verify_hash() {
        return Err(VaultError::Authentication(
            "password verification hash mismatch".into(),
        ));
    }

    cipher.decrypt(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 1024;

    fn no_progress(_done: usize, _total: usize) {}

    fn roundtrip(data: &[u8]) {
        let cipher = PasswordCipher::new("123");
        let encrypted = match encrypt_resource(data, &cipher, CHUNK, no_progress).unwrap() {
            Transform::Done(out) => out,
            Transform::AlreadyInState => panic!("plaintext flagged as encrypted"),
        };
        let decrypted = match decrypt_resource(&encrypted, &cipher, no_progress).unwrap() {
            Transform::Done(out) => out,
            Transform::AlreadyInState => panic!("ciphertext flagged as plaintext"),
        };
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_roundtrip_chunk_boundaries() {
        let pattern: Vec<u8> = (0..3 * CHUNK).map(|i| (i % 251) as u8).collect();

        roundtrip(&[]); // N = 0
        roundtrip(&pattern[..CHUNK]); // N = C
        roundtrip(&pattern[..CHUNK + 1]); // N = C + 1
        roundtrip(&pattern[..3 * CHUNK - 1]); // N = 3C - 1
    }

    #[test]
    fn test_encrypt_twice_is_noop() {
        let cipher = PasswordCipher::new("123");
        let data = vec![0xABu8; 2000];

        let once = match encrypt_resource(&data, &cipher, CHUNK, no_progress).unwrap() {
            Transform::Done(out) => out,
            Transform::AlreadyInState => panic!(),
        };
        let twice = encrypt_resource(&once, &cipher, CHUNK, no_progress).unwrap();
        assert!(matches!(twice, Transform::AlreadyInState));
    }

    #[test]
    fn test_decrypt_plaintext_is_noop() {
        let cipher = PasswordCipher::new("123");
        let result = decrypt_resource(b"just some image bytes", &cipher, no_progress).unwrap();
        assert!(matches!(result, Transform::AlreadyInState));
    }

    #[test]
    fn test_truncated_stream_is_corrupted() {
        let cipher = PasswordCipher::new("123");
        let data = vec![7u8; 3 * CHUNK];

        let mut encrypted = match encrypt_resource(&data, &cipher, CHUNK, no_progress).unwrap() {
            Transform::Done(out) => out,
            Transform::AlreadyInState => panic!(),
        };
        encrypted.truncate(encrypted.len() - 10);

        let result = decrypt_resource(&encrypted, &cipher, no_progress);
        assert!(matches!(result, Err(VaultError::ResourceCorrupted(_))));
    }

    #[test]
    fn test_wrong_password_fails_clean() {
        let cipher = PasswordCipher::new("123");
        let other = PasswordCipher::new("124");
        let data = vec![42u8; 100];

        let encrypted = match encrypt_resource(&data, &cipher, CHUNK, no_progress).unwrap() {
            Transform::Done(out) => out,
            Transform::AlreadyInState => panic!(),
        };
        let result = decrypt_resource(&encrypted, &other, no_progress);
        assert!(matches!(result, Err(VaultError::Authentication(_))));
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let cipher = PasswordCipher::new("123");
        let data = vec![1u8; 2 * CHUNK + 10];

        let mut reports = Vec::new();
        encrypt_resource(&data, &cipher, CHUNK, |done, total| {
            reports.push((done, total));
        })
        .unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(reports.last().unwrap().0, data.len());
    }

    #[test]
    fn test_predicates() {
        assert!(is_envelope("00ff:abcd"));
        assert!(!is_envelope("00ff"));
        assert!(!is_envelope(":abcd"));
        assert!(!is_envelope("xyz:abcd"));

        assert!(is_encrypted_resource_data(b"00000009aabb:ccdd"));
        assert!(!is_encrypted_resource_data(b"plain old bytes"));
        assert!(!is_encrypted_resource_data(b"12345678"));

        let sealed = format!("{}%{}", "a".repeat(32), "00ff:abcd");
        assert!(is_encrypted_note_body(&sealed));
        assert!(!is_encrypted_note_body("# just a markdown heading"));
        assert!(!is_encrypted_note_body(&format!("{}%plain", "a".repeat(32))));
    }

    #[test]
    fn test_note_body_roundtrip() {
        let cipher = PasswordCipher::new("123");
        let body = "我是一条段落 [[1.jpg]]";

        let sealed = seal_note_body(body, &cipher).unwrap();
        assert!(is_encrypted_note_body(&sealed));
        assert_eq!(open_note_body(&sealed, &cipher).unwrap(), body);
    }

    #[test]
    fn test_note_body_wrong_password() {
        let cipher = PasswordCipher::new("123");
        let other = PasswordCipher::new("124");

        let sealed = seal_note_body("content", &cipher).unwrap();
        assert!(matches!(
            open_note_body(&sealed, &other),
            Err(VaultError::Authentication(_))
        ));
    }
}
