//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    changes::ChangesArgs, completions::CompletionsArgs, config::ConfigCommands,
    import::ImportArgs, init::InitArgs, list::ListArgs, resolve::ResolveArgs,
    status::StatusArgs, synonym::SynonymCommands,
};
use crate::core::ResolverKind;

#[derive(Parser)]
#[command(name = "tir")]
#[command(author, version, about = "Track Import Resolver")]
#[command(long_about = "Resolves the raw platform, sensor and reference names found in track data files to canonical entities, asking the operator or applying fixed defaults.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Entity store (default: tir.db, or TIR_DATABASE)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// How unknown names are resolved
    #[arg(long, global = true, value_enum)]
    pub resolver: Option<ResolverKind>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the entity store
    Init(InitArgs),

    /// Resolve one name to its canonical entity
    Resolve(ResolveArgs),

    /// Import CSV manifests, one unit per file
    Import(ImportArgs),

    /// List canonical entities of a kind
    List(ListArgs),

    /// Synonym management
    #[command(subcommand)]
    Synonym(SynonymCommands),

    /// Show store counts
    Status(StatusArgs),

    /// Show the audit trail
    Changes(ChangesArgs),

    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Just IDs, one per line
    Id,
}
