//! `tir synonym` command - Record and list alternate names

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_config, names_by_id, open_store};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Change, EntityKind, EntityStore};
use crate::resolve::{resolver_for, ImportSession};

#[derive(Subcommand, Debug)]
pub enum SynonymCommands {
    /// Record an alias for an existing entity
    Add(AddArgs),

    /// List recorded synonyms
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Entity kind
    pub kind: EntityKind,

    /// The alternate name
    pub alias: String,

    /// Canonical name (or an existing synonym) of the entity
    pub canonical: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only synonyms of this kind
    pub kind: Option<EntityKind>,
}

pub fn run(cmd: SynonymCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SynonymCommands::Add(args) => run_add(args, global),
        SynonymCommands::List(args) => run_list(args, global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut db = open_store(&config)?;
    let mut session = ImportSession::new(resolver_for(&config));

    let change = Change::new(
        config.author(),
        format!("synonym {} '{}' for '{}'", args.kind, args.alias, args.canonical),
    );
    let target = session.unit(&mut db, &change, |scope| {
        scope.record_synonym(args.kind, &args.alias, &args.canonical)
    })?;

    println!(
        "{} '{}' added to synonyms of {} {}",
        style("✓").green(),
        style(&args.alias).yellow(),
        style(&target.id).cyan(),
        style(&target.name).bold()
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = open_store(&config)?;
    let store = db.store();

    let synonyms = store
        .synonyms(args.kind)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&synonyms).into_diagnostic()?);
        return Ok(());
    }

    let kinds: Vec<EntityKind> = match args.kind {
        Some(kind) => vec![kind],
        None => EntityKind::all().to_vec(),
    };
    let names = names_by_id(&store, &kinds)?;
    let rows: Vec<[String; 4]> = synonyms
        .iter()
        .map(|s| {
            [
                s.kind.to_string(),
                s.alias.clone(),
                names
                    .get(&s.entity)
                    .cloned()
                    .unwrap_or_else(|| s.entity.to_string()),
                s.entity.to_string(),
            ]
        })
        .collect();

    match global.format {
        OutputFormat::Tsv => {
            for row in &rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["kind", "alias", "canonical", "entity"])
                .into_diagnostic()?;
            for row in &rows {
                wtr.write_record(row).into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Id => {
            for synonym in &synonyms {
                println!("{}", synonym.entity);
            }
        }
        _ => {
            if rows.is_empty() {
                println!("No synonyms recorded.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["KIND", "ALIAS", "CANONICAL", "ENTITY"]);
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}
