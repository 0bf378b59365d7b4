//! The interactive vault session.
//!
//! Screens are states of an explicit loop: each step shows one screen
//! and returns the next one, so repeated bad input never grows the
//! stack.  Every prompt that can be answered wrongly is retried at most
//! `max_attempts` times before falling back to the previous screen, and
//! nothing is written until the operator has confirmed it.

use zeroize::Zeroizing;

use crate::audit::{AuditLog, Operation};
use crate::cli::output;
use crate::cli::prompt::Prompter;
use crate::config::Settings;
use crate::errors::{VaultError, Result};
use crate::generator;
use crate::session::{Session, SessionState};
use crate::vault::validation::{validate_identity, validate_owner_secret, validate_record_fields};
use crate::vault::VaultStore;

/// One screen of the interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Start,
    SignUp,
    Login,
    Help,
    Menu,
    CreateRecord,
    Manage,
    ViewRecords,
    EditRecord,
    DeleteRecord,
    SearchRecords,
    Account,
    Generate,
    SignOut,
    Quit,
    Exit,
}

const START_ITEMS: &[&str] = &["Sign up", "Log in", "Help", "Quit"];

const MENU_ITEMS: &[&str] = &[
    "Help",
    "Create a new password",
    "Manage passwords",
    "Account settings",
    "Generate a password",
    "Sign out",
    "Quit",
];

const MANAGE_ITEMS: &[&str] = &[
    "View stored passwords",
    "Update a stored password",
    "Delete a stored password",
    "Search for passwords",
    "Back to menu",
];

const ACCOUNT_ITEMS: &[&str] = &[
    "Change username",
    "Change password",
    "Delete account",
    "Back to menu",
];

const HELP_TEXT: &str = "\
Sign up       Create an account with a unique username (3-20 letters, digits,
              underscores) and a password of at least 8 characters with a
              lowercase letter, an uppercase letter and a digit.
Log in        Unlock your stored passwords. If you forgot your password you
              can reset it after a failed attempt.
Create        Store a site, its username and its password. Passwords can be
              typed or generated.
Manage        View, update, delete or search your stored passwords. Update
              and delete look a site up by its exact name; search matches
              any part of the name, ignoring case.
Account       Rename your account, change your password, or delete the
              account together with every password it stores.
Sign out      Lock the vault and return to the start screen.
Quit          Leave Encrypto (you will be asked to confirm).";

/// Errors that send the operator back to the same prompt.
fn is_retryable(e: &VaultError) -> bool {
    e.is_not_found()
        || matches!(
            e,
            VaultError::Validation(_)
                | VaultError::Mismatch(_)
                | VaultError::DuplicateIdentity(_)
                | VaultError::BadSecret
        )
}

/// Drives one operator session against an open vault.
pub struct Shell<'a, P: Prompter> {
    store: &'a mut VaultStore,
    settings: &'a Settings,
    audit: Option<&'a AuditLog>,
    session: Session,
    prompter: P,
}

impl<'a, P: Prompter> Shell<'a, P> {
    pub fn new(
        store: &'a mut VaultStore,
        settings: &'a Settings,
        audit: Option<&'a AuditLog>,
        prompter: P,
    ) -> Self {
        Self {
            store,
            settings,
            audit,
            session: Session::new(settings.max_attempts),
            prompter,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run screens until the operator quits.
    pub fn run(&mut self) -> Result<()> {
        output::heading("Welcome to Encrypto.");
        let mut screen = Screen::Start;
        while screen != Screen::Exit {
            screen = self.step(screen)?;
        }
        self.session.sign_out();
        Ok(())
    }

    /// Show one screen and return the next.
    ///
    /// Recoverable errors are reported and lead back to a safe screen;
    /// fatal ones (key store, integrity) and prompt failures propagate.
    pub fn step(&mut self, screen: Screen) -> Result<Screen> {
        let outcome = match screen {
            Screen::Start => self.start(),
            Screen::SignUp => self.sign_up(),
            Screen::Login => self.login(),
            Screen::Help => self.help(),
            Screen::Menu => self.menu(),
            Screen::CreateRecord => self.create_record(),
            Screen::Manage => self.manage(),
            Screen::ViewRecords => self.view_records(),
            Screen::EditRecord => self.edit_record(),
            Screen::DeleteRecord => self.delete_record(),
            Screen::SearchRecords => self.search_records(),
            Screen::Account => self.account(),
            Screen::Generate => self.generate(),
            Screen::SignOut => self.sign_out(),
            Screen::Quit => self.quit(),
            Screen::Exit => Ok(Screen::Exit),
        };

        match outcome {
            Err(e)
                if is_retryable(&e)
                    || matches!(e, VaultError::NotAuthenticated | VaultError::InvalidSession(_)) => {
                output::error(&e.to_string());
                Ok(self.home())
            }
            other => other,
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Start screen when anonymous, main menu when signed in.
    fn home(&self) -> Screen {
        if self.session.is_authenticated() {
            Screen::Menu
        } else {
            Screen::Start
        }
    }

    /// Run `attempt` until it succeeds, at most `max_attempts` times.
    ///
    /// Returns `Ok(None)` when the budget is used up.
    fn with_retries<T>(&mut self, mut attempt: impl FnMut(&mut Self) -> Result<T>) -> Result<Option<T>> {
        for _ in 0..self.settings.max_attempts {
            match attempt(self) {
                Ok(value) => return Ok(Some(value)),
                Err(e) if is_retryable(&e) => output::error(&e.to_string()),
                Err(e) => return Err(e),
            }
        }
        output::warning("Too many attempts.");
        Ok(None)
    }

    fn audit(&self, operation: Operation, site: Option<&str>, details: Option<&str>) {
        if let Some(audit) = self.audit {
            let identity = self.session.owner().ok().map(|o| o.identity().to_string());
            audit.log(operation, identity.as_deref(), site, details);
        }
    }

    fn audit_as(&self, operation: Operation, identity: &str, details: Option<&str>) {
        if let Some(audit) = self.audit {
            audit.log(operation, Some(identity), None, details);
        }
    }

    /// Ask for a new owner password (policy-checked) and its confirmation.
    fn new_owner_password(&mut self, prompt: &str) -> Result<Option<(Zeroizing<String>, Zeroizing<String>)>> {
        let secret = self.with_retries(|shell| {
            let secret = shell.prompter.password(prompt)?;
            validate_owner_secret(&secret)?;
            Ok(secret)
        })?;
        let Some(secret) = secret else {
            return Ok(None);
        };
        let confirmation = self.prompter.password("Confirm password")?;
        Ok(Some((secret, confirmation)))
    }

    // ------------------------------------------------------------------
    // Anonymous screens
    // ------------------------------------------------------------------

    fn start(&mut self) -> Result<Screen> {
        let choice = self.prompter.select("Please select an option", START_ITEMS)?;
        Ok(match choice {
            0 => Screen::SignUp,
            1 => Screen::Login,
            2 => Screen::Help,
            _ => Screen::Quit,
        })
    }

    fn sign_up(&mut self) -> Result<Screen> {
        output::heading("Sign up");

        let identity = self.with_retries(|shell| {
            let identity = shell.prompter.input("Choose a username")?;
            validate_identity(&identity)?;
            if shell.store.owner_exists(&identity)? {
                return Err(VaultError::DuplicateIdentity(identity));
            }
            Ok(identity)
        })?;
        let Some(identity) = identity else {
            return Ok(Screen::Start);
        };

        let Some((secret, confirmation)) = self.new_owner_password("Choose a password")? else {
            return Ok(Screen::Start);
        };

        self.session
            .sign_up(self.store, &identity, &secret, &confirmation)?;
        self.audit_as(Operation::SignUp, &identity, None);
        output::success("Account created successfully. Log in to continue.");
        Ok(Screen::Start)
    }

    fn login(&mut self) -> Result<Screen> {
        output::heading("Log in");

        let identity = self.with_retries(|shell| {
            let identity = shell.prompter.input("Username")?;
            shell.session.begin_login(shell.store, &identity)?;
            Ok(identity)
        })?;
        let Some(identity) = identity else {
            return Ok(Screen::Start);
        };

        loop {
            let secret = self.prompter.login_password("Password")?;
            let outcome = self.session.submit_secret(self.store, &secret).map(|_| ());
            match outcome {
                Ok(()) => {
                    self.audit(Operation::Login, None, None);
                    output::success("Login successful!");
                    return Ok(Screen::Menu);
                }
                Err(VaultError::BadSecret) => {
                    output::error(&VaultError::BadSecret.to_string());
                    if !matches!(self.session.state(), SessionState::Authenticating { .. }) {
                        output::warning("Too many failed attempts.");
                        self.audit_as(Operation::LoginFailed, &identity, Some("attempts exhausted"));
                        return Ok(Screen::Start);
                    }
                    if self.prompter.confirm("Forgot your password? Reset it now?", false)? {
                        return self.reset_password(&identity);
                    }
                }
                Err(e) => {
                    self.session.cancel_login();
                    return Err(e);
                }
            }
        }
    }

    fn reset_password(&mut self, identity: &str) -> Result<Screen> {
        output::heading(&format!("Reset password for {identity}"));
        let Some((secret, confirmation)) = self.new_owner_password("New password")? else {
            self.session.cancel_login();
            return Ok(Screen::Start);
        };

        if let Err(e) = self
            .session
            .reset_secret(self.store, &secret, &confirmation)
        {
            self.session.cancel_login();
            return Err(e);
        }
        self.audit_as(Operation::ResetPassword, identity, None);
        output::success("Password reset successfully. Please log in again.");
        Ok(Screen::Login)
    }

    fn help(&mut self) -> Result<Screen> {
        output::heading("Help");
        println!("{HELP_TEXT}");
        self.prompter.pause()?;
        Ok(self.home())
    }

    fn quit(&mut self) -> Result<Screen> {
        if self.prompter.confirm("Quit Encrypto?", true)? {
            output::info("Goodbye.");
            Ok(Screen::Exit)
        } else {
            Ok(self.home())
        }
    }

    // ------------------------------------------------------------------
    // Authenticated screens
    // ------------------------------------------------------------------

    fn menu(&mut self) -> Result<Screen> {
        let identity = self.session.owner()?.identity().to_string();
        output::heading(&format!("Signed in as {identity}. What would you like to do?"));
        let choice = self.prompter.select("Please select an option", MENU_ITEMS)?;
        Ok(match choice {
            0 => Screen::Help,
            1 => Screen::CreateRecord,
            2 => Screen::Manage,
            3 => Screen::Account,
            4 => Screen::Generate,
            5 => Screen::SignOut,
            _ => Screen::Quit,
        })
    }

    fn create_record(&mut self) -> Result<Screen> {
        output::heading("Create a new password");

        let fields = self.with_retries(|shell| {
            let site = shell.prompter.input("Website/Application name")?;
            let account_name = shell.prompter.input("Username")?;
            validate_record_fields(&site, &account_name)?;
            Ok((site, account_name))
        })?;
        let Some((site, account_name)) = fields else {
            return Ok(Screen::Menu);
        };

        let source = self
            .prompter
            .select("Password", &["Type a password", "Generate a password"])?;
        let secret = if source == 1 {
            let secret = generator::generate(
                self.settings.generator_length,
                &self.settings.password_policy(),
            )?;
            output::info(&format!(
                "Generated a {}-character password.",
                self.settings.generator_length
            ));
            secret
        } else {
            self.prompter.password("Password")?
        };

        if !self
            .prompter
            .confirm(&format!("Store password for '{site}'?"), true)?
        {
            output::info("Cancelled.");
            return Ok(Screen::Menu);
        }

        let owner = self.session.owner()?;
        self.store
            .create_record(owner, &site, &account_name, &secret)?;
        self.audit(Operation::CreateRecord, Some(&site), None);
        output::success("Password stored successfully!");
        Ok(Screen::Menu)
    }

    fn manage(&mut self) -> Result<Screen> {
        output::heading("Manage passwords");
        let choice = self.prompter.select("What would you like to do", MANAGE_ITEMS)?;
        Ok(match choice {
            0 => Screen::ViewRecords,
            1 => Screen::EditRecord,
            2 => Screen::DeleteRecord,
            3 => Screen::SearchRecords,
            _ => Screen::Menu,
        })
    }

    fn view_records(&mut self) -> Result<Screen> {
        let owner = self.session.owner()?;
        let records = self.store.list_records(owner)?;
        let revealed = self.store.reveal_all(owner, records);

        output::info(&format!("{} stored password(s)", revealed.len()));
        output::print_records_table(&revealed);
        self.prompter.pause()?;
        Ok(Screen::Manage)
    }

    fn edit_record(&mut self) -> Result<Screen> {
        output::heading("Update a stored password");

        let record = self.with_retries(|shell| {
            let site = shell.prompter.input("Website of the password to update")?;
            let owner = shell.session.owner()?;
            shell.store.find_record_by_site(owner, &site)
        })?;
        let Some(record) = record else {
            return Ok(Screen::Manage);
        };

        let new_secret = self.prompter.password("New password")?;
        if !self
            .prompter
            .confirm(&format!("Update password for '{}'?", record.site), true)?
        {
            output::info("Cancelled.");
            return Ok(Screen::Manage);
        }

        let owner = self.session.owner()?;
        self.store.update_record_secret(owner, &record, &new_secret)?;
        self.audit(Operation::UpdateRecord, Some(&record.site), None);
        output::success("Password updated successfully!");
        Ok(Screen::Manage)
    }

    fn delete_record(&mut self) -> Result<Screen> {
        output::heading("Delete a stored password");

        let record = self.with_retries(|shell| {
            let site = shell.prompter.input("Website of the password to delete")?;
            let owner = shell.session.owner()?;
            shell.store.find_record_by_site(owner, &site)
        })?;
        let Some(record) = record else {
            return Ok(Screen::Manage);
        };

        if !self
            .prompter
            .confirm(&format!("Delete password for '{}'?", record.site), false)?
        {
            output::info("Cancelled.");
            return Ok(Screen::Manage);
        }

        let owner = self.session.owner()?;
        self.store.delete_record(owner, &record)?;
        self.audit(Operation::DeleteRecord, Some(&record.site), None);
        output::success("Password deleted successfully!");
        Ok(Screen::Manage)
    }

    fn search_records(&mut self) -> Result<Screen> {
        output::heading("Search passwords");

        let found = self.with_retries(|shell| {
            let needle = shell.prompter.input("Search websites for")?;
            let owner = shell.session.owner()?;
            let records = shell.store.search_records(owner, &needle)?;
            if records.is_empty() {
                return Err(VaultError::RecordNotFound(needle));
            }
            Ok(records)
        })?;
        let Some(found) = found else {
            return Ok(Screen::Manage);
        };

        let owner = self.session.owner()?;
        let revealed = self.store.reveal_all(owner, found);
        output::print_records_table(&revealed);
        self.prompter.pause()?;
        Ok(Screen::Manage)
    }

    fn account(&mut self) -> Result<Screen> {
        output::heading("Account settings");
        let choice = self.prompter.select("What would you like to do", ACCOUNT_ITEMS)?;
        match choice {
            0 => self.rename_account(),
            1 => self.change_password(),
            2 => self.delete_account(),
            _ => Ok(Screen::Menu),
        }
    }

    fn rename_account(&mut self) -> Result<Screen> {
        let new_identity = self.with_retries(|shell| {
            let identity = shell.prompter.input("New username")?;
            validate_identity(&identity)?;
            if shell.store.owner_exists(&identity)? {
                return Err(VaultError::DuplicateIdentity(identity));
            }
            Ok(identity)
        })?;
        let Some(new_identity) = new_identity else {
            return Ok(Screen::Account);
        };

        if !self
            .prompter
            .confirm(&format!("Rename your account to '{new_identity}'?"), true)?
        {
            output::info("Cancelled.");
            return Ok(Screen::Account);
        }

        let old_identity = self.session.owner()?.identity().to_string();
        let moved = self.session.rename(self.store, &new_identity)?;
        self.audit(Operation::Rename, None, Some(&format!("from {old_identity}")));
        output::success(&format!(
            "Username changed to '{new_identity}' ({moved} stored password(s) moved)"
        ));
        Ok(Screen::Account)
    }

    fn change_password(&mut self) -> Result<Screen> {
        let current = self.prompter.password("Current password")?;
        let Some((secret, confirmation)) = self.new_owner_password("New password")? else {
            return Ok(Screen::Account);
        };

        self.session
            .change_secret(self.store, &current, &secret, &confirmation)?;
        self.audit(Operation::ChangePassword, None, None);
        output::success("Password changed.");
        Ok(Screen::Account)
    }

    fn delete_account(&mut self) -> Result<Screen> {
        let owner = self.session.owner()?;
        let identity = owner.identity().to_string();
        let count = self.store.record_count(owner)?;

        output::warning(&format!(
            "This permanently deletes '{identity}' and {count} stored password(s)."
        ));
        let typed = self.prompter.input("Type your username to confirm")?;
        if !self.prompter.confirm("Delete this account?", false)? {
            output::info("Cancelled.");
            return Ok(Screen::Account);
        }

        let removed = self.session.delete_account(self.store, &typed)?;
        self.audit_as(Operation::DeleteAccount, &identity, Some(&format!("{removed} records removed")));
        output::success("Account deleted.");
        Ok(Screen::Start)
    }

    fn generate(&mut self) -> Result<Screen> {
        let secret = generator::generate(
            self.settings.generator_length,
            &self.settings.password_policy(),
        )?;
        output::info("Generated password:");
        println!("{}", secret.as_str());
        self.prompter.pause()?;
        Ok(self.home())
    }

    fn sign_out(&mut self) -> Result<Screen> {
        self.audit(Operation::Logout, None, None);
        self.session.sign_out();
        output::info("Signed out.");
        Ok(Screen::Start)
    }
}
