//! Vault key management.
//!
//! The vault key is a 32-byte random AES-256 key that lives in a file
//! next to the database, outside the record store.  It is generated on
//! first run and read back on every later run.  There is no rotation:
//! replacing the key would require re-encrypting every stored record,
//! and losing the file makes all stored secrets unrecoverable.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use zeroize::Zeroize;

use crate::errors::{VaultError, Result};

/// Length of the vault key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte vault key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Create a `VaultKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Self {
        let mut key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        key.as_mut_slice().zeroize();
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to build a cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// Load the vault key at `path`, creating it on first run.
pub fn load_or_create_key(path: &Path) -> Result<VaultKey> {
    match load_key(path) {
        Err(VaultError::KeyStore(_)) if !path.exists() => {
            tracing::info!(path = %path.display(), "no vault key found, generating a new one");
            create_key(path)
        }
        other => other,
    }
}

/// Generate a new key and write it to `path`.
///
/// Fails if a file already exists there.  On Unix the file is created
/// with mode 0600 so it is never readable by other users, not even
/// briefly.
pub fn create_key(path: &Path) -> Result<VaultKey> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::KeyStore(format!("cannot create key directory: {e}"))
            })?;
        }
    }

    let key = VaultKey::generate();
    write_new_file(path, |file| {
        file.write_all(key.as_bytes())?;
        file.sync_all()
    })?;
    Ok(key)
}

/// Create `path` exclusively and fill it with `write`.
///
/// A failed write removes the partial file again, so the next run finds
/// no key at all instead of a truncated one.
fn write_new_file(path: &Path, write: impl FnOnce(&mut File) -> io::Result<()>) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => {
            VaultError::KeyStore(format!("vault key already exists at {}", path.display()))
        }
        _ => VaultError::KeyStore(format!("failed to create vault key: {e}")),
    })?;

    if let Err(e) = write(&mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial vault key");
        }
        return Err(VaultError::KeyStore(format!("failed to write vault key: {e}")));
    }

    Ok(())
}

/// Read an existing key and validate its length.
pub fn load_key(path: &Path) -> Result<VaultKey> {
    let mut data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            VaultError::KeyStore(format!("vault key not found at {}", path.display()))
        }
        ErrorKind::PermissionDenied => VaultError::KeyStore(format!(
            "permission denied reading vault key at {}",
            path.display()
        )),
        _ => VaultError::KeyStore(format!("failed to read vault key: {e}")),
    })?;

    if data.len() != KEY_LEN {
        let len = data.len();
        data.zeroize();
        return Err(VaultError::KeyStore(format!(
            "vault key must be exactly {KEY_LEN} bytes, got {len}"
        )));
    }

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&data);
    data.zeroize();
    Ok(VaultKey::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_creates_and_second_run_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.key");

        let created = load_or_create_key(&path).unwrap();
        assert!(path.exists());

        let loaded = load_or_create_key(&path).unwrap();
        assert_eq!(created.as_bytes(), loaded.as_bytes());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("vault.key");

        load_or_create_key(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
    }

    #[test]
    fn create_key_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.key");

        create_key(&path).unwrap();
        let result = create_key(&path);
        assert!(matches!(result, Err(VaultError::KeyStore(_))));
    }

    #[test]
    fn wrong_length_is_a_keystore_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.key");
        fs::write(&path, [0u8; 16]).unwrap();

        let result = load_or_create_key(&path);
        assert!(matches!(result, Err(VaultError::KeyStore(_))));
        // The corrupt file must be left alone, not replaced.
        assert_eq!(fs::read(&path).unwrap().len(), 16);
    }

    #[test]
    fn failed_write_leaves_no_partial_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.key");

        let result = write_new_file(&path, |file| {
            file.write_all(&[0xAB; 5])?;
            Err(io::Error::new(ErrorKind::WriteZero, "disk full"))
        });
        assert!(matches!(result, Err(VaultError::KeyStore(_))));
        assert!(!path.exists());

        // The next run starts clean instead of tripping over 5 stray bytes.
        let key = load_or_create_key(&path).unwrap();
        assert_eq!(load_key(&path).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn generated_keys_differ() {
        let a = VaultKey::generate();
        let b = VaultKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn debug_does_not_print_key_bytes() {
        let key = VaultKey::from_bytes([0xAB; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "VaultKey(..)");
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.key");
        load_or_create_key(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "vault key should have 0o600 permissions");
    }
}
