//! `encrypto version`: display version and build details.

use console::style;

use crate::errors::Result;
use crate::vault::schema::SCHEMA_VERSION;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    let current = env!("CARGO_PKG_VERSION");
    println!("encrypto {current}");
    println!(
        "{} AES-256-GCM records, Argon2id account passwords, schema v{SCHEMA_VERSION}",
        style("\u{2192}").dim()
    );
    Ok(())
}
