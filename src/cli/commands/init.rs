//! `tir init` command - Create the entity store

use console::style;
use miette::Result;

use crate::cli::helpers::{load_config, open_store};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct InitArgs {}

pub fn run(_args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let path = config.database();

    if path.exists() {
        // Opening checks the schema version of an existing store
        open_store(&config)?;
        println!(
            "{} Entity store already exists at {}",
            style("!").yellow(),
            style(path.display()).cyan()
        );
        return Ok(());
    }

    open_store(&config)?;
    println!(
        "{} Initialized entity store at {}",
        style("✓").green(),
        style(path.display()).cyan()
    );

    if !global.quiet {
        println!();
        println!("Next steps:");
        println!(
            "  {} Import a manifest of names",
            style("tir import tracks.csv").yellow()
        );
        println!(
            "  {} Resolve a single name",
            style("tir resolve platform \"HMS Foo\"").yellow()
        );
        println!("  {} Show what is stored", style("tir status").yellow());
    }
    Ok(())
}
