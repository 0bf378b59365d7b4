use thiserror::Error;

/// All errors that can occur in Encrypto.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: stored secret is corrupt or was sealed with another key")]
    DecryptionFailed,

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Vault key error: {0}")]
    KeyStore(String),

    // --- Account errors ---
    #[error("Username '{0}' is already taken")]
    DuplicateIdentity(String),

    #[error("No account named '{0}'")]
    OwnerNotFound(String),

    #[error("Wrong password")]
    BadSecret,

    #[error("{0}")]
    Validation(String),

    #[error("{0} do not match")]
    Mismatch(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Operation not allowed right now: {0}")]
    InvalidSession(String),

    // --- Record errors ---
    #[error("No stored password for '{0}'")]
    RecordNotFound(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl VaultError {
    /// True for "no such owner" and "no such record" alike.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OwnerNotFound(_) | Self::RecordNotFound(_))
    }

    /// Errors the interactive surface must not paper over with a retry.
    ///
    /// A missing or corrupt vault key and a failed integrity check both
    /// mean stored data can't be trusted; everything else can be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyStore(_) | Self::DecryptionFailed)
    }
}

/// Convenience type alias for Encrypto results.
pub type Result<T> = std::result::Result<T, VaultError>;
