//! NoteVault - CLI
//!
//! Command-line interface for the note encryption pipeline.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use notevault::NoteVault;

#[derive(Parser)]
#[command(name = "notevault")]
#[command(version = notevault::VERSION)]
#[command(about = "NoteVault - password-based encryption for markdown notes and linked media")]
struct Cli {
    /// Vault root directory
    #[arg(short, long, default_value = ".")]
    vault: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a note and its linked resources
    Encrypt {
        /// Note path, relative to the vault root
        note: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Decrypt a note and its recorded resources
    Decrypt {
        /// Note path, relative to the vault root
        note: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Encrypt or decrypt depending on the note's current state
    Toggle {
        /// Note path, relative to the vault root
        note: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Show whether a note is currently encrypted
    Status {
        /// Note path, relative to the vault root
        note: String,
    },

    /// Prune bookkeeping records for notes that no longer exist
    Prune,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut vault = NoteVault::open(&cli.vault)
        .with_context(|| format!("failed to open vault at {}", cli.vault.display()))?;

    match cli.command {
        Commands::Encrypt { note, password } => {
            vault
                .encrypt_note(&note, &password)
                .with_context(|| format!("failed to encrypt {note}"))?;
            println!("encrypted {note}");
        }
        Commands::Decrypt { note, password } => {
            vault
                .decrypt_note(&note, &password)
                .with_context(|| format!("failed to decrypt {note}"))?;
            println!("decrypted {note}");
        }
        Commands::Toggle { note, password } => {
            vault
                .toggle_note(&note, &password)
                .with_context(|| format!("failed to toggle {note}"))?;
            println!("toggled {note}");
        }
        Commands::Status { note } => {
            let encrypted = vault
                .is_note_encrypted(&note)
                .with_context(|| format!("failed to read {note}"))?;
            println!(
                "{note}: {}",
                if encrypted { "encrypted" } else { "plaintext" }
            );
        }
        Commands::Prune => {
            vault.on_note_open().context("failed to prune records")?;
            println!("pruned stale records");
        }
    }

    Ok(())
}
