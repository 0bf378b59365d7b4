//! `encrypto shell`: the interactive session (also the default command).

use tracing::info;

use crate::cli::prompt::TerminalPrompter;
use crate::cli::shell::Shell;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `shell` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut ctx = open_vault(cli)?;
    info!(vault = %ctx.vault_dir.display(), "vault opened");

    let mut shell = Shell::new(
        &mut ctx.store,
        &ctx.settings,
        ctx.audit.as_ref(),
        TerminalPrompter,
    );
    shell.run()
}
