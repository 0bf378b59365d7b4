//! High-level vault operations used by the session and the CLI.
//!
//! `VaultStore` wraps the SQLite database, the vault key and the
//! password hasher so the rest of the application can work with simple
//! method calls like `store.create_record(&owner, "example.com", ...)`.
//!
//! Every record operation takes the authenticated `Owner` and filters
//! on its identity in SQL, so one owner can never read or change
//! another owner's rows.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption::{decrypt, encrypt, Ciphertext};
use crate::crypto::hasher::CredentialHasher;
use crate::crypto::keyfile::VaultKey;
use crate::errors::{VaultError, Result};

use super::models::{Owner, Record, RevealedRecord};
use super::schema;
use super::validation::{validate_identity, validate_owner_secret, validate_record_fields};

const RECORD_COLUMNS: &str =
    "id, site, account_name, secret_ciphertext, owner_identity, created_at, updated_at";

/// The main vault handle.  Open one with `VaultStore::open` at process
/// start; dropping it closes the database.
pub struct VaultStore {
    /// Open SQLite connection.
    conn: Connection,

    /// Path to the database file (`None` for in-memory stores).
    path: Option<PathBuf>,

    /// Key used to seal and open record secrets (zeroized on drop).
    key: VaultKey,

    /// Argon2id hasher for owner passwords.
    hasher: CredentialHasher,

    /// Hash checked against when a login names an unknown identity,
    /// so both failure paths pay for exactly one Argon2 verification.
    /// Built when the store opens, never during a login.
    decoy_hash: String,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open (or create) the vault database at `path`.
    pub fn open(path: &Path, key: VaultKey, hasher: CredentialHasher) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Owner-only access to the database file.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "vault database opened");
        Self::with_connection(conn, Some(path.to_path_buf()), key, hasher)
    }

    /// Open a throwaway store that lives only in memory.
    pub fn open_in_memory(key: VaultKey, hasher: CredentialHasher) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, None, key, hasher)
    }

    fn with_connection(
        conn: Connection,
        path: Option<PathBuf>,
        key: VaultKey,
        hasher: CredentialHasher,
    ) -> Result<Self> {
        schema::initialize(&conn)?;
        let decoy_hash = hasher.hash("decoy-password-for-unknown-identities")?;
        Ok(Self {
            conn,
            path,
            key,
            hasher,
            decoy_hash,
        })
    }

    // ------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------

    /// Register a new owner.  The password is stored only as a hash.
    pub fn create_owner(&mut self, identity: &str, secret: &str) -> Result<Owner> {
        validate_identity(identity)?;
        validate_owner_secret(secret)?;

        if self.owner_exists(identity)? {
            return Err(VaultError::DuplicateIdentity(identity.to_string()));
        }

        let secret_hash = self.hasher.hash(secret)?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO owners (identity, secret_hash, created_at) VALUES (?1, ?2, ?3)",
                params![identity, secret_hash, now],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => {
                    VaultError::DuplicateIdentity(identity.to_string())
                }
                _ => VaultError::Storage(e),
            })?;

        info!(identity, "owner created");
        Ok(Owner::new(identity.to_string(), secret_hash))
    }

    /// Check a login attempt and return the owner handle on success.
    ///
    /// Unknown identities and wrong passwords are reported separately,
    /// but both paths run one Argon2 verification.
    pub fn authenticate(&self, identity: &str, secret: &str) -> Result<Owner> {
        let stored = self.stored_hash(identity)?;

        let Some(secret_hash) = stored else {
            let _ = self.hasher.verify(secret, &self.decoy_hash)?;
            debug!(identity, "login for unknown identity");
            return Err(VaultError::OwnerNotFound(identity.to_string()));
        };

        if !self.hasher.verify(secret, &secret_hash)? {
            debug!(identity, "login with wrong password");
            return Err(VaultError::BadSecret);
        }

        info!(identity, "owner authenticated");
        Ok(Owner::new(identity.to_string(), secret_hash))
    }

    /// Returns `true` if an owner with this identity exists.
    pub fn owner_exists(&self, identity: &str) -> Result<bool> {
        Ok(self.stored_hash(identity)?.is_some())
    }

    /// Change an owner's identity and move all of its records with it.
    ///
    /// Both updates run in one transaction: either the owner row and
    /// every record reference change together, or nothing changes.
    /// Returns the number of records that moved.
    pub fn rename_owner(&mut self, owner: &mut Owner, new_identity: &str) -> Result<usize> {
        validate_identity(new_identity)?;
        let old_identity = owner.identity().to_string();
        if old_identity == new_identity {
            return self.record_count(owner);
        }

        let tx = self.conn.transaction()?;

        let taken: Option<String> = tx
            .query_row(
                "SELECT identity FROM owners WHERE identity = ?1",
                [new_identity],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(VaultError::DuplicateIdentity(new_identity.to_string()));
        }

        let moved: usize = tx.query_row(
            "SELECT COUNT(*) FROM records WHERE owner_identity = ?1",
            [&old_identity],
            |row| row.get(0),
        )?;

        let updated = tx.execute(
            "UPDATE owners SET identity = ?1 WHERE identity = ?2",
            params![new_identity, old_identity],
        )?;
        if updated == 0 {
            return Err(VaultError::OwnerNotFound(old_identity));
        }

        // ON UPDATE CASCADE normally moves the rows already; this
        // statement makes the move explicit and is a no-op then.
        tx.execute(
            "UPDATE records SET owner_identity = ?1 WHERE owner_identity = ?2",
            params![new_identity, old_identity],
        )?;

        tx.commit()?;

        owner.set_identity(new_identity.to_string());
        info!(from = %old_identity, to = new_identity, records = moved, "owner renamed");
        Ok(moved)
    }

    /// Replace an owner's password after checking the current one.
    pub fn change_secret(&mut self, owner: &mut Owner, current: &str, new_secret: &str) -> Result<()> {
        let stored = self
            .stored_hash(owner.identity())?
            .ok_or_else(|| VaultError::OwnerNotFound(owner.identity().to_string()))?;
        if !self.hasher.verify(current, &stored)? {
            return Err(VaultError::BadSecret);
        }

        let new_hash = self.write_secret_hash(owner.identity(), new_secret)?;
        owner.set_secret_hash(new_hash);
        info!(identity = owner.identity(), "owner password changed");
        Ok(())
    }

    /// Replace the password of `identity` without the current one.
    ///
    /// This is the "forgot password" path offered from the login screen.
    pub fn reset_secret(&mut self, identity: &str, new_secret: &str) -> Result<()> {
        if !self.owner_exists(identity)? {
            return Err(VaultError::OwnerNotFound(identity.to_string()));
        }
        self.write_secret_hash(identity, new_secret)?;
        info!(identity, "owner password reset");
        Ok(())
    }

    /// Delete an owner and all of its records in one transaction.
    ///
    /// Consumes the handle.  Returns the number of records removed.
    pub fn delete_owner(&mut self, owner: Owner) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM records WHERE owner_identity = ?1",
            [owner.identity()],
        )?;
        let deleted = tx.execute("DELETE FROM owners WHERE identity = ?1", [owner.identity()])?;
        if deleted == 0 {
            return Err(VaultError::OwnerNotFound(owner.identity().to_string()));
        }

        tx.commit()?;

        info!(identity = owner.identity(), records = removed, "owner deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Seal `secret` and store a new record for `owner`.
    pub fn create_record(
        &mut self,
        owner: &Owner,
        site: &str,
        account_name: &str,
        secret: &str,
    ) -> Result<Record> {
        validate_record_fields(site, account_name)?;
        if !self.owner_exists(owner.identity())? {
            return Err(VaultError::OwnerNotFound(owner.identity().to_string()));
        }

        let sealed = encrypt(&self.key, secret.as_bytes())?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        self.conn.execute(
            "INSERT INTO records (site, account_name, secret_ciphertext, owner_identity, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![site, account_name, sealed.as_bytes(), owner.identity(), now_str],
        )?;
        let id = self.conn.last_insert_rowid();

        debug!(identity = owner.identity(), id, site, "record created");
        Ok(Record {
            id,
            site: site.to_string(),
            account_name: account_name.to_string(),
            secret_ciphertext: sealed,
            owner_identity: owner.identity().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All of `owner`'s records, sorted by site.  Secrets stay sealed.
    pub fn list_records(&self, owner: &Owner) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE owner_identity = ?1
             ORDER BY site COLLATE NOCASE, id"
        ))?;
        let rows = stmt.query_map([owner.identity()], record_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// The first of `owner`'s records whose site matches exactly.
    pub fn find_record_by_site(&self, owner: &Owner, site: &str) -> Result<Record> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM records
                     WHERE owner_identity = ?1 AND site = ?2
                     ORDER BY id
                     LIMIT 1"
                ),
                params![owner.identity(), site],
                record_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::RecordNotFound(site.to_string()))
    }

    /// `owner`'s records whose site contains `needle`, ignoring case.
    pub fn search_records(&self, owner: &Owner, needle: &str) -> Result<Vec<Record>> {
        let needle = needle.to_lowercase();
        let mut records = self.list_records(owner)?;
        records.retain(|r| r.site.to_lowercase().contains(&needle));
        Ok(records)
    }

    /// Re-seal a record's secret with a new value.
    pub fn update_record_secret(&mut self, owner: &Owner, record: &Record, new_secret: &str) -> Result<()> {
        let sealed = encrypt(&self.key, new_secret.as_bytes())?;
        let now = Utc::now().to_rfc3339();

        let updated = self.conn.execute(
            "UPDATE records SET secret_ciphertext = ?1, updated_at = ?2
             WHERE id = ?3 AND owner_identity = ?4",
            params![sealed.as_bytes(), now, record.id, owner.identity()],
        )?;
        if updated == 0 {
            return Err(VaultError::RecordNotFound(record.site.clone()));
        }

        debug!(identity = owner.identity(), id = record.id, "record secret updated");
        Ok(())
    }

    /// Remove one of `owner`'s records.
    pub fn delete_record(&mut self, owner: &Owner, record: &Record) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM records WHERE id = ?1 AND owner_identity = ?2",
            params![record.id, owner.identity()],
        )?;
        if deleted == 0 {
            return Err(VaultError::RecordNotFound(record.site.clone()));
        }

        debug!(identity = owner.identity(), id = record.id, "record deleted");
        Ok(())
    }

    /// Number of records `owner` has stored.
    pub fn record_count(&self, owner: &Owner) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE owner_identity = ?1",
            [owner.identity()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Decrypt a record's secret for display.
    pub fn reveal(&self, owner: &Owner, record: &Record) -> Result<Zeroizing<String>> {
        if record.owner_identity != owner.identity() {
            return Err(VaultError::RecordNotFound(record.site.clone()));
        }

        let plaintext = decrypt(&self.key, &record.secret_ciphertext)?;
        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::DecryptionFailed
        })
    }

    /// Decrypt every record independently.  A record that fails to
    /// decrypt carries its own error; the others are unaffected.
    pub fn reveal_all(&self, owner: &Owner, records: Vec<Record>) -> Vec<RevealedRecord> {
        records
            .into_iter()
            .map(|record| {
                let secret = self.reveal(owner, &record);
                if let Err(ref e) = secret {
                    warn!(id = record.id, site = %record.site, error = %e, "record failed to decrypt");
                }
                RevealedRecord { record, secret }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the database file, if it is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn stored_hash(&self, identity: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT secret_hash FROM owners WHERE identity = ?1",
                [identity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    fn write_secret_hash(&mut self, identity: &str, new_secret: &str) -> Result<String> {
        validate_owner_secret(new_secret)?;
        let new_hash = self.hasher.hash(new_secret)?;
        let updated = self.conn.execute(
            "UPDATE owners SET secret_hash = ?1 WHERE identity = ?2",
            params![new_hash, identity],
        )?;
        if updated == 0 {
            return Err(VaultError::OwnerNotFound(identity.to_string()));
        }
        Ok(new_hash)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let created: String = row.get(5)?;
    let updated: String = row.get(6)?;
    Ok(Record {
        id: row.get(0)?,
        site: row.get(1)?,
        account_name: row.get(2)?,
        secret_ciphertext: Ciphertext::from_bytes(row.get(3)?),
        owner_identity: row.get(4)?,
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

/// Unreadable timestamps show as the Unix epoch, never as "now".
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(value, error = %e, "unreadable record timestamp");
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hasher::HasherParams;

    fn store() -> VaultStore {
        let hasher = CredentialHasher::new(HasherParams::minimum()).unwrap();
        VaultStore::open_in_memory(VaultKey::from_bytes([0x42; 32]), hasher).unwrap()
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let s = store();
        let result = s.authenticate("nobody", "Passw0rd!");
        assert!(matches!(result, Err(VaultError::OwnerNotFound(_))));
    }

    #[test]
    fn record_stores_ciphertext_not_plaintext() {
        let mut s = store();
        let owner = s.create_owner("alice", "Passw0rd!").unwrap();
        let record = s.create_record(&owner, "example.com", "alice", "s3cr3t!").unwrap();

        let raw: Vec<u8> = s
            .conn
            .query_row(
                "SELECT secret_ciphertext FROM records WHERE id = ?1",
                [record.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!raw.windows(7).any(|w| w == b"s3cr3t!"));
        assert_eq!(raw, record.secret_ciphertext.as_bytes());
    }

    #[test]
    fn failed_rename_leaves_everything_in_place() {
        let mut s = store();
        let mut alice = s.create_owner("alice", "Passw0rd!").unwrap();
        s.create_owner("bob", "Passw0rd!").unwrap();
        s.create_record(&alice, "example.com", "alice", "pw").unwrap();

        let result = s.rename_owner(&mut alice, "bob");
        assert!(matches!(result, Err(VaultError::DuplicateIdentity(_))));
        assert_eq!(alice.identity(), "alice");
        assert_eq!(s.list_records(&alice).unwrap().len(), 1);
    }

    fn owner_of_every_record(s: &VaultStore) -> Vec<String> {
        let mut stmt = s.conn.prepare("SELECT owner_identity FROM records").unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<rusqlite::Result<_>>().unwrap()
    }

    #[test]
    fn rename_rolls_back_when_moving_records_fails() {
        let mut s = store();
        let mut alice = s.create_owner("alice", "Passw0rd!").unwrap();
        s.create_record(&alice, "a.com", "alice", "pw").unwrap();
        s.create_record(&alice, "b.com", "alice", "pw").unwrap();
        s.conn
            .execute_batch(
                "CREATE TRIGGER refuse_record_move BEFORE UPDATE OF owner_identity ON records
                 BEGIN SELECT RAISE(ABORT, 'record move refused'); END;",
            )
            .unwrap();

        let result = s.rename_owner(&mut alice, "alice2");
        assert!(matches!(result, Err(VaultError::Storage(_))));

        assert_eq!(alice.identity(), "alice");
        assert!(s.owner_exists("alice").unwrap());
        assert!(!s.owner_exists("alice2").unwrap());
        assert_eq!(owner_of_every_record(&s), vec!["alice", "alice"]);
        assert!(s.authenticate("alice", "Passw0rd!").is_ok());
    }

    #[test]
    fn delete_rolls_back_when_removing_the_owner_fails() {
        let mut s = store();
        let alice = s.create_owner("alice", "Passw0rd!").unwrap();
        s.create_record(&alice, "a.com", "alice", "pw").unwrap();
        s.create_record(&alice, "b.com", "alice", "pw").unwrap();
        s.conn
            .execute_batch(
                "CREATE TRIGGER refuse_owner_delete BEFORE DELETE ON owners
                 BEGIN SELECT RAISE(ABORT, 'owner delete refused'); END;",
            )
            .unwrap();

        let result = s.delete_owner(alice.clone());
        assert!(matches!(result, Err(VaultError::Storage(_))));

        assert!(s.owner_exists("alice").unwrap());
        assert_eq!(s.record_count(&alice).unwrap(), 2);
        assert_eq!(owner_of_every_record(&s), vec!["alice", "alice"]);
    }

    #[test]
    fn rename_to_same_identity_is_a_no_op() {
        let mut s = store();
        let mut alice = s.create_owner("alice", "Passw0rd!").unwrap();
        s.create_record(&alice, "a.com", "alice", "pw").unwrap();
        assert_eq!(s.rename_owner(&mut alice, "alice").unwrap(), 1);
    }

    #[test]
    fn decoy_hash_is_ready_before_the_first_login() {
        let s = store();
        assert!(s.decoy_hash.starts_with("$argon2id$"));

        let before = s.decoy_hash.clone();
        let _ = s.authenticate("nobody", "Passw0rd!");
        assert_eq!(s.decoy_hash, before);
    }

    #[test]
    fn corrupt_timestamp_reads_as_epoch() {
        let mut s = store();
        let owner = s.create_owner("alice", "Passw0rd!").unwrap();
        let record = s.create_record(&owner, "example.com", "alice", "pw").unwrap();
        s.conn
            .execute(
                "UPDATE records SET updated_at = 'garbage' WHERE id = ?1",
                [record.id],
            )
            .unwrap();

        let listed = s.list_records(&owner).unwrap();
        assert_eq!(listed[0].updated_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(listed[0].account_name, "alice");
    }
}
