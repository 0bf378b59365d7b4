//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every screen and command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::RevealedRecord;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a section heading.
pub fn heading(msg: &str) {
    println!("\n{}", style(msg).cyan().bold());
}

/// Text shown in place of a secret that failed its integrity check.
pub const UNREADABLE: &str = "<unreadable: integrity check failed>";

/// Print decrypted records (Site, Username, Password, Updated).
///
/// Records whose secret failed to decrypt are still listed, with a
/// marker instead of the password, followed by a warning.
pub fn print_records_table(records: &[RevealedRecord]) {
    if records.is_empty() {
        info("No stored passwords yet.");
        tip("Choose \"Create a new password\" from the menu to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Site", "Username", "Password", "Updated"]);

    let mut unreadable = 0usize;
    for r in records {
        let secret = match &r.secret {
            Ok(secret) => secret.to_string(),
            Err(_) => {
                unreadable += 1;
                UNREADABLE.to_string()
            }
        };
        table.add_row(vec![
            r.record.site.clone(),
            r.record.account_name.clone(),
            secret,
            r.record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");

    if unreadable > 0 {
        error(&format!(
            "{unreadable} stored password(s) failed the integrity check; the vault key or database may be damaged."
        ));
    }
}
