//! `tir changes` command - Audit trail

use chrono::Local;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_config, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct ChangesArgs {
    /// Show only the most recent N changes
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(args: ChangesArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = open_store(&config)?;
    let mut changes = db
        .store()
        .changes()
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(limit) = args.limit {
        let skip = changes.len().saturating_sub(limit);
        changes.drain(..skip);
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&changes).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            for change in &changes {
                println!(
                    "{}\t{}\t{}\t{}",
                    change.id,
                    change.user,
                    change.created.to_rfc3339(),
                    change.reason
                );
            }
        }
        OutputFormat::Id => {
            for change in &changes {
                println!("{}", change.id);
            }
        }
        _ => {
            if changes.is_empty() {
                println!("No changes recorded.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["ID", "USER", "WHEN", "REASON"]);
            for change in &changes {
                builder.push_record([
                    change.id.to_string(),
                    change.user.clone(),
                    change
                        .created
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                    truncate_str(&change.reason, 60),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}
