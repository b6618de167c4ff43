//! `tir status` command - Store counts

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{load_config, open_store};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = open_store(&config)?;
    let counts = db
        .store()
        .counts()
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            let entities: serde_json::Map<String, serde_json::Value> = counts
                .entities
                .iter()
                .map(|(kind, n)| (kind.to_string(), serde_json::Value::from(*n)))
                .collect();
            let status = serde_json::json!({
                "database": config.database(),
                "entities": entities,
                "synonyms": counts.synonyms,
                "changes": counts.changes,
            });
            println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            for (kind, n) in &counts.entities {
                println!("{}\t{}", kind, n);
            }
            println!("synonyms\t{}", counts.synonyms);
            println!("changes\t{}", counts.changes);
        }
        _ => {
            let width = 40;
            println!("{}", style("Entity Store Status").bold().underlined());
            println!("{}", style(config.database().display()).dim());
            println!("{}", "═".repeat(width));
            for (kind, n) in &counts.entities {
                let count = if *n > 0 {
                    style(n.to_string()).cyan()
                } else {
                    style(n.to_string()).dim()
                };
                println!("  {:<20} {:>6}", kind.to_string(), count);
            }
            println!("{}", "─".repeat(width));
            println!("  {:<20} {:>6}", "synonyms", style(counts.synonyms).cyan());
            println!("  {:<20} {:>6}", "changes", style(counts.changes).cyan());
        }
    }
    Ok(())
}
