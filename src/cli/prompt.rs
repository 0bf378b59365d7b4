//! Operator input for the interactive shell.
//!
//! The shell asks for everything through the `Prompter` trait so the
//! screen logic can be driven by a script in tests.  `TerminalPrompter`
//! is the real implementation on top of `dialoguer`.

use dialoguer::{Confirm, Input, Password, Select};
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// Environment variable that answers the login password prompt (CI/scripts).
/// Setting, changing and confirming a password always prompt.
pub const PASSWORD_ENV: &str = "ENCRYPTO_PASSWORD";

pub trait Prompter {
    /// Pick one of `items`; returns its index.
    fn select(&mut self, title: &str, items: &[&str]) -> Result<usize>;

    /// Free-text entry.
    fn input(&mut self, prompt: &str) -> Result<String>;

    /// Hidden entry.
    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Hidden entry for the password that unlocks a login.
    fn login_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.password(prompt)
    }

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Wait until the operator is done reading.
    fn pause(&mut self) -> Result<()>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

fn prompt_failed(e: dialoguer::Error) -> VaultError {
    VaultError::CommandFailed(format!("input prompt: {e}"))
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, title: &str, items: &[&str]) -> Result<usize> {
        Select::new()
            .with_prompt(title)
            .items(items)
            .default(0)
            .interact()
            .map_err(prompt_failed)
    }

    fn input(&mut self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_failed)
    }

    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(prompt_failed)
    }

    fn login_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        if let Ok(pw) = std::env::var(PASSWORD_ENV) {
            if !pw.is_empty() {
                return Ok(Zeroizing::new(pw));
            }
        }
        self.password(prompt)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_failed)
    }

    fn pause(&mut self) -> Result<()> {
        Input::<String>::new()
            .with_prompt("Press Enter to go back")
            .allow_empty(true)
            .interact_text()
            .map(|_| ())
            .map_err(prompt_failed)
    }
}
