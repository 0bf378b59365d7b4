//! CLI module: Clap argument parser, prompts, output helpers, the
//! interactive shell, and command implementations.

pub mod commands;
pub mod output;
pub mod prompt;
pub mod shell;

use std::path::PathBuf;

use clap::Parser;

use crate::audit::AuditLog;
use crate::config::Settings;
use crate::crypto::{load_or_create_key, CredentialHasher};
use crate::errors::Result;
use crate::vault::VaultStore;

/// Encrypto CLI: local encrypted password vault.
#[derive(Parser)]
#[command(name = "encrypto", about = "Local encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Vault directory (default: .encrypto, or `vault_dir` in .encrypto.toml)
    #[arg(long, global = true, env = "ENCRYPTO_VAULT_DIR")]
    pub vault_dir: Option<String>,

    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Start the interactive vault session (default)
    Shell,

    /// Generate a random password and print it
    Generate {
        /// Password length (default: `generator_length` from config)
        #[arg(short, long)]
        length: Option<usize>,
        /// Minimum lowercase letters
        #[arg(long)]
        min_lowercase: Option<usize>,
        /// Minimum uppercase letters
        #[arg(long)]
        min_uppercase: Option<usize>,
        /// Minimum digits
        #[arg(long)]
        min_digit: Option<usize>,
        /// Minimum symbols
        #[arg(long)]
        min_symbol: Option<usize>,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Everything an interactive session needs, opened once at start-up and
/// released when dropped.
pub struct VaultContext {
    pub settings: Settings,
    pub vault_dir: PathBuf,
    pub store: VaultStore,
    pub audit: Option<AuditLog>,
}

/// Load settings from the working directory, applying `--vault-dir`.
pub fn load_settings(cli: &Cli) -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(dir) = &cli.vault_dir {
        settings.vault_dir = dir.clone();
    }
    Ok((cwd, settings))
}

/// Open the vault key, database and audit log.
///
/// The key file is created on first run.
pub fn open_vault(cli: &Cli) -> Result<VaultContext> {
    let (cwd, settings) = load_settings(cli)?;
    let vault_dir = settings.vault_dir_path(&cwd);
    if !vault_dir.exists() {
        std::fs::create_dir_all(&vault_dir)?;
        output::info(&format!("Created vault directory: {}", vault_dir.display()));
    }

    let key = load_or_create_key(&settings.key_path(&cwd))?;
    let hasher = CredentialHasher::new(settings.hasher_params())?;
    let store = VaultStore::open(&settings.database_path(&cwd), key, hasher)?;

    let audit = if settings.audit_log {
        AuditLog::open(&vault_dir)
    } else {
        None
    };

    Ok(VaultContext {
        settings,
        vault_dir,
        store,
        audit,
    })
}
