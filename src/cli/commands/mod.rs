//! Subcommand implementations, one module per command.

pub mod audit_cmd;
pub mod completions;
pub mod generate;
pub mod shell;
pub mod version;
