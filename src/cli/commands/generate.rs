//! `encrypto generate`: print a random password.
//!
//! Usage:
//!   encrypto generate                  # configured length and minimums
//!   encrypto generate -l 32            # 32 characters
//!   encrypto generate --min-symbol 0   # no symbols required

use crate::cli::{load_settings, Cli};
use crate::errors::Result;
use crate::generator::{self, PasswordPolicy};

/// Per-invocation overrides of the configured generator settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerateArgs {
    pub length: Option<usize>,
    pub min_lowercase: Option<usize>,
    pub min_uppercase: Option<usize>,
    pub min_digit: Option<usize>,
    pub min_symbol: Option<usize>,
}

impl GenerateArgs {
    fn policy(&self, base: PasswordPolicy) -> PasswordPolicy {
        PasswordPolicy {
            min_lowercase: self.min_lowercase.unwrap_or(base.min_lowercase),
            min_uppercase: self.min_uppercase.unwrap_or(base.min_uppercase),
            min_digit: self.min_digit.unwrap_or(base.min_digit),
            min_symbol: self.min_symbol.unwrap_or(base.min_symbol),
        }
    }
}

/// Execute the `generate` command.
pub fn execute(cli: &Cli, args: GenerateArgs) -> Result<()> {
    let (_, settings) = load_settings(cli)?;
    let length = args.length.unwrap_or(settings.generator_length);
    let policy = args.policy(settings.password_policy());

    let password = generator::generate(length, &policy)?;
    println!("{}", password.as_str());
    Ok(())
}
