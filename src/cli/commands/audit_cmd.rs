//! `encrypto audit`: display the audit log.
//!
//! Usage:
//!   encrypto audit               # show last 50 entries
//!   encrypto audit --last 20     # show last 20
//!   encrypto audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditLog, Operation};
use crate::cli::{load_settings, output, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let since = since.map(parse_since).transpose()?;

    let (cwd, settings) = load_settings(cli)?;
    let vault_dir = settings.vault_dir_path(&cwd);

    // Reading the log must not create a vault as a side effect.
    if !AuditLog::db_path(&vault_dir).exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let audit = AuditLog::open(&vault_dir)
        .ok_or_else(|| VaultError::AuditError("failed to open audit database".into()))?;
    let entries = audit.query(last, since)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Turn "7d", "24h" or "30m" into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        VaultError::CommandFailed(format!(
            "invalid duration '{input}'; use a form like 7d, 24h or 30m"
        ))
    };

    let split = input.len().checked_sub(1).ok_or_else(invalid)?;
    if !input.is_char_boundary(split) {
        return Err(invalid());
    }
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        "d" => Duration::try_days(amount),
        "h" => Duration::try_hours(amount),
        "m" => Duration::try_minutes(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(span).ok_or_else(invalid)
}

/// Print audit entries in a formatted table.
fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Username", "Site", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.identity.clone().unwrap_or_else(|| "-".into()),
            entry.site.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

fn colorize_operation(op: &str) -> String {
    match op {
        "signup" | "login" | "create-record" => style(op).green().to_string(),
        "update-record" | "rename" | "change-password" => style(op).blue().to_string(),
        "delete-record" | "delete-account" | "login-failed" => style(op).red().to_string(),
        "reset-password" => style(op).yellow().to_string(),
        _ => op.to_string(),
    }
}
