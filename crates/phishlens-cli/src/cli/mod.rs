//! CLI subcommand implementations for the phishlens binary.

pub mod extract_cmd;
pub mod output;
pub mod schema_cmd;
