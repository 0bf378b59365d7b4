//! Operation history for the vault.
//!
//! Each sign-up, login and record change is appended to
//! `<vault_dir>/audit.db`.  Entries name the identity, the site and a
//! short note; secrets and hashes are never written.  The log is best
//! effort: if it can't be opened or written, the vault keeps working.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::errors::{VaultError, Result};

const AUDIT_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS audit_log (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    operation TEXT NOT NULL,
    identity  TEXT,
    site      TEXT,
    details   TEXT
);";

/// Something worth remembering that happened to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SignUp,
    Login,
    LoginFailed,
    ResetPassword,
    Logout,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    Rename,
    ChangePassword,
    DeleteAccount,
}

impl Operation {
    /// Name stored in the `operation` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignUp => "signup",
            Self::Login => "login",
            Self::LoginFailed => "login-failed",
            Self::ResetPassword => "reset-password",
            Self::Logout => "logout",
            Self::CreateRecord => "create-record",
            Self::UpdateRecord => "update-record",
            Self::DeleteRecord => "delete-record",
            Self::Rename => "rename",
            Self::ChangePassword => "change-password",
            Self::DeleteAccount => "delete-account",
        }
    }
}

/// One row of the log as read back.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub identity: Option<String>,
    pub site: Option<String>,
    pub details: Option<String>,
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) `<vault_dir>/audit.db`.
    ///
    /// `None` means auditing is unavailable for this run.
    pub fn open(vault_dir: &Path) -> Option<Self> {
        let path = Self::db_path(vault_dir);
        match Self::try_open(&path) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "audit log unavailable");
                None
            }
        }
    }

    fn try_open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
                tracing::debug!(error = %e, "could not restrict audit log permissions");
            }
        }

        conn.execute_batch(AUDIT_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Append one entry.  Write failures are traced and otherwise ignored.
    pub fn log(
        &self,
        operation: Operation,
        identity: Option<&str>,
        site: Option<&str>,
        details: Option<&str>,
    ) {
        let result = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, identity, site, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![Utc::now().to_rfc3339(), operation.as_str(), identity, site, details],
        );
        if let Err(e) = result {
            tracing::debug!(operation = operation.as_str(), error = %e, "audit write skipped");
        }
    }

    /// Newest entries first, at most `limit`, optionally not older than `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // UTC RFC 3339 strings compare chronologically as text.
        let since = since.map(|ts| ts.to_rfc3339());

        let audit_err = |e: rusqlite::Error| VaultError::AuditError(e.to_string());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, identity, site, details
                 FROM audit_log
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(audit_err)?;

        let entries = stmt
            .query_map(params![since, limit], entry_from_row)
            .map_err(audit_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(audit_err)?;
        Ok(entries)
    }

    pub fn db_path(vault_dir: &Path) -> PathBuf {
        vault_dir.join("audit.db")
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let stamp: String = row.get(1)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&stamp)
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |dt| dt.with_timezone(&Utc)),
        operation: row.get(2)?,
        identity: row.get(3)?,
        site: row.get(4)?,
        details: row.get(5)?,
    })
}
