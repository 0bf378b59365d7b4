//! Account session: who is signed in right now.
//!
//! The session is a small state machine:
//!
//! ```text
//! Anonymous ──sign-up / login──▶ Authenticating ──ok──▶ Authenticated
//!     ▲                               │                     │
//!     └──── not found / too many ─────┘                     │
//!     └───────────── sign out / delete account ─────────────┘
//! ```
//!
//! It does not own the vault; every transition takes the `VaultStore`
//! explicitly, and the authenticated `Owner` handle is what scopes all
//! record operations afterwards.

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::errors::{VaultError, Result};
use crate::vault::{Owner, VaultStore};

/// Where the session is in the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// An existing identity was named; waiting for its password.
    Authenticating { identity: String, attempts: u32 },
    Authenticated(Owner),
}

/// One operator's session with the vault.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    max_attempts: u32,
}

/// Compare a value with its confirmation entry in constant time.
pub fn confirm_matches(value: &str, confirmation: &str) -> bool {
    value.as_bytes().ct_eq(confirmation.as_bytes()).into()
}

impl Session {
    /// A fresh, anonymous session.  `max_attempts` bounds how many wrong
    /// passwords one login attempt may submit.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: SessionState::Anonymous,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// The signed-in owner.
    pub fn owner(&self) -> Result<&Owner> {
        match &self.state {
            SessionState::Authenticated(owner) => Ok(owner),
            _ => Err(VaultError::NotAuthenticated),
        }
    }

    // ------------------------------------------------------------------
    // Anonymous transitions
    // ------------------------------------------------------------------

    /// Register a new owner.  The session stays anonymous afterwards;
    /// the new owner logs in like anyone else.
    pub fn sign_up(
        &mut self,
        vault: &mut VaultStore,
        identity: &str,
        secret: &str,
        confirmation: &str,
    ) -> Result<()> {
        self.require_anonymous("sign up")?;
        self.state = SessionState::Authenticating {
            identity: identity.to_string(),
            attempts: 0,
        };

        let result = if confirm_matches(secret, confirmation) {
            vault.create_owner(identity, secret).map(|_| ())
        } else {
            Err(VaultError::Mismatch("Passwords".into()))
        };

        self.state = SessionState::Anonymous;
        result
    }

    /// Start a login for `identity`.  Unknown identities leave the
    /// session anonymous with `OwnerNotFound`.
    pub fn begin_login(&mut self, vault: &VaultStore, identity: &str) -> Result<()> {
        self.require_anonymous("log in")?;
        if !vault.owner_exists(identity)? {
            return Err(VaultError::OwnerNotFound(identity.to_string()));
        }
        self.state = SessionState::Authenticating {
            identity: identity.to_string(),
            attempts: 0,
        };
        Ok(())
    }

    /// Submit the password for the identity named in `begin_login`.
    ///
    /// A wrong password keeps the session authenticating until the
    /// attempt budget runs out, then drops it back to anonymous.
    pub fn submit_secret(&mut self, vault: &VaultStore, secret: &str) -> Result<&Owner> {
        let SessionState::Authenticating { identity, attempts } = &self.state else {
            return Err(VaultError::InvalidSession("no login in progress".into()));
        };
        let identity = identity.clone();
        let attempts = attempts + 1;

        match vault.authenticate(&identity, secret) {
            Ok(owner) => {
                self.state = SessionState::Authenticated(owner);
                self.owner()
            }
            Err(VaultError::BadSecret) if attempts < self.max_attempts => {
                self.state = SessionState::Authenticating { identity, attempts };
                Err(VaultError::BadSecret)
            }
            Err(e) => {
                debug!(identity = %identity, attempts, "login abandoned");
                self.state = SessionState::Anonymous;
                Err(e)
            }
        }
    }

    /// Log in with one identity/password pair.
    pub fn login(&mut self, vault: &VaultStore, identity: &str, secret: &str) -> Result<&Owner> {
        self.begin_login(vault, identity)?;
        let outcome = self.submit_secret(vault, secret).map(|_| ());
        if let Err(e) = outcome {
            self.state = SessionState::Anonymous;
            return Err(e);
        }
        self.owner()
    }

    /// Reset the password of the identity being logged in, then return to
    /// anonymous so the owner logs in again with the new password.
    pub fn reset_secret(
        &mut self,
        vault: &mut VaultStore,
        new_secret: &str,
        confirmation: &str,
    ) -> Result<()> {
        let SessionState::Authenticating { identity, .. } = &self.state else {
            return Err(VaultError::InvalidSession("no login in progress".into()));
        };
        if !confirm_matches(new_secret, confirmation) {
            return Err(VaultError::Mismatch("Passwords".into()));
        }

        let identity = identity.clone();
        vault.reset_secret(&identity, new_secret)?;
        self.state = SessionState::Anonymous;
        Ok(())
    }

    /// Abandon a login in progress.
    pub fn cancel_login(&mut self) {
        if matches!(self.state, SessionState::Authenticating { .. }) {
            self.state = SessionState::Anonymous;
        }
    }

    // ------------------------------------------------------------------
    // Authenticated transitions
    // ------------------------------------------------------------------

    /// Rename the signed-in owner; its records follow.
    pub fn rename(&mut self, vault: &mut VaultStore, new_identity: &str) -> Result<usize> {
        let owner = self.owner_mut()?;
        vault.rename_owner(owner, new_identity)
    }

    /// Change the signed-in owner's password.
    pub fn change_secret(
        &mut self,
        vault: &mut VaultStore,
        current: &str,
        new_secret: &str,
        confirmation: &str,
    ) -> Result<()> {
        if !confirm_matches(new_secret, confirmation) {
            return Err(VaultError::Mismatch("Passwords".into()));
        }
        let owner = self.owner_mut()?;
        vault.change_secret(owner, current, new_secret)
    }

    /// Delete the signed-in owner and everything it stored.
    ///
    /// `typed_identity` must repeat the owner's identity.  Returns the
    /// number of records removed; the session ends anonymous.
    pub fn delete_account(&mut self, vault: &mut VaultStore, typed_identity: &str) -> Result<usize> {
        let owner = self.owner()?;
        if !confirm_matches(owner.identity(), typed_identity) {
            return Err(VaultError::Mismatch("Usernames".into()));
        }

        let owner = owner.clone();
        let removed = vault.delete_owner(owner)?;
        self.state = SessionState::Anonymous;
        Ok(removed)
    }

    /// End the session.
    pub fn sign_out(&mut self) {
        self.state = SessionState::Anonymous;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn owner_mut(&mut self) -> Result<&mut Owner> {
        match &mut self.state {
            SessionState::Authenticated(owner) => Ok(owner),
            _ => Err(VaultError::NotAuthenticated),
        }
    }

    fn require_anonymous(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::Anonymous => Ok(()),
            _ => Err(VaultError::InvalidSession(format!(
                "sign out before trying to {action}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_anonymous() {
        let session = Session::new(3);
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert!(matches!(session.owner(), Err(VaultError::NotAuthenticated)));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let session = Session::new(0);
        assert_eq!(session.max_attempts, 1);
    }

    #[test]
    fn confirm_matches_is_exact() {
        assert!(confirm_matches("Passw0rd!", "Passw0rd!"));
        assert!(!confirm_matches("Passw0rd!", "Passw0rd"));
        assert!(!confirm_matches("Passw0rd!", "passw0rd!"));
    }

    #[test]
    fn cancel_outside_login_is_harmless() {
        let mut session = Session::new(3);
        session.cancel_login();
        assert_eq!(session.state(), &SessionState::Anonymous);
    }
}
