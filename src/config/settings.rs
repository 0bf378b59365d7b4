use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::hasher::HasherParams;
use crate::errors::{VaultError, Result};
use crate::generator::PasswordPolicy;

/// Project-level configuration, loaded from `.encrypto.toml`.
///
/// Every field has a sensible default so Encrypto works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the working directory) holding the vault.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// SQLite database file name inside `vault_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Vault key file name inside `vault_dir`.
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Default length of generated passwords.
    #[serde(default = "default_generator_length")]
    pub generator_length: usize,

    #[serde(default = "default_min_one")]
    pub generator_min_lowercase: usize,

    #[serde(default = "default_min_one")]
    pub generator_min_uppercase: usize,

    #[serde(default = "default_min_one")]
    pub generator_min_digit: usize,

    #[serde(default = "default_min_one")]
    pub generator_min_symbol: usize,

    /// How many times an interactive prompt is retried on bad input.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Record vault operations in `<vault_dir>/audit.db`.
    #[serde(default = "default_audit_log")]
    pub audit_log: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".encrypto".to_string()
}

fn default_database_file() -> String {
    "vault.db".to_string()
}

fn default_key_file() -> String {
    "vault.key".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_generator_length() -> usize {
    16
}

fn default_min_one() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_audit_log() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            database_file: default_database_file(),
            key_file: default_key_file(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            generator_length: default_generator_length(),
            generator_min_lowercase: default_min_one(),
            generator_min_uppercase: default_min_one(),
            generator_min_digit: default_min_one(),
            generator_min_symbol: default_min_one(),
            max_attempts: default_max_attempts(),
            audit_log: default_audit_log(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".encrypto.toml";

    /// Load settings from `<project_dir>/.encrypto.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.max_attempts == 0 {
            return Err(VaultError::ConfigError(
                "max_attempts must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Full path to the vault directory.
    pub fn vault_dir_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }

    /// Example: `project_dir/.encrypto/vault.db`
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        self.vault_dir_path(project_dir).join(&self.database_file)
    }

    /// Example: `project_dir/.encrypto/vault.key`
    pub fn key_path(&self, project_dir: &Path) -> PathBuf {
        self.vault_dir_path(project_dir).join(&self.key_file)
    }

    /// Convert the Argon2 settings into hasher params.
    pub fn hasher_params(&self) -> HasherParams {
        HasherParams {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// The configured generator policy.
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_lowercase: self.generator_min_lowercase,
            min_uppercase: self.generator_min_uppercase,
            min_digit: self.generator_min_digit,
            min_symbol: self.generator_min_symbol,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
