//! Owner and Record types stored inside the vault database.

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::crypto::Ciphertext;
use crate::errors::Result;

/// An authenticated vault user.
///
/// Only `VaultStore` can hand one out (on sign-up or login), so holding
/// an `Owner` is proof that the identity was authenticated in this
/// process.  Every record operation is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    identity: String,
    secret_hash: String,
}

impl Owner {
    pub(crate) fn new(identity: String, secret_hash: String) -> Self {
        Self {
            identity,
            secret_hash,
        }
    }

    /// The owner's login name.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The stored Argon2id PHC string (never the plaintext).
    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub(crate) fn set_identity(&mut self, identity: String) {
        self.identity = identity;
    }

    pub(crate) fn set_secret_hash(&mut self, secret_hash: String) {
        self.secret_hash = secret_hash;
    }
}

/// One stored site credential.  The secret stays sealed until it is
/// explicitly revealed through `VaultStore::reveal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Surrogate id assigned by the store.
    pub id: i64,

    /// Site or application label (e.g. "example.com").
    pub site: String,

    /// Login name used on that site.
    pub account_name: String,

    /// Nonce + AES-256-GCM ciphertext + tag.
    pub secret_ciphertext: Ciphertext,

    /// Identity of the owning `Owner`.
    pub owner_identity: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record paired with the outcome of decrypting its secret.
///
/// Decryption failures stay attached to the record they belong to, so a
/// single corrupt row does not hide the rest of a listing.
#[derive(Debug)]
pub struct RevealedRecord {
    pub record: Record,
    pub secret: Result<Zeroizing<String>>,
}
