//! CLI command implementations

pub mod changes;
pub mod completions;
pub mod config;
pub mod import;
pub mod init;
pub mod list;
pub mod resolve;
pub mod status;
pub mod synonym;
