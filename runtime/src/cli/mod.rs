//! CLI subcommand implementations for the tomato-tracker binary.

pub mod doctor;
pub mod history_cmd;
pub mod output;
pub mod scrape_cmd;
