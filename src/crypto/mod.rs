//! NoteVault - Cryptographic Core
//!
//! Password-derived AES-256-GCM with textual hex envelopes.

pub mod cipher;

pub use cipher::*;
