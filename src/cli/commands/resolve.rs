//! `tir resolve` command - Resolve one name

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{load_config, open_store};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Change, EntityKind, Hints, ResolvedEntity};
use crate::resolve::{resolver_for, ImportSession};

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Entity kind (platform, sensor, datafile, nationality, platform-type, sensor-type, datafile-type, privacy)
    pub kind: EntityKind,

    /// Raw name as it appears in the data (omit for a nameless request)
    pub name: Option<String>,

    #[command(flatten)]
    pub hints: HintArgs,

    /// Reason recorded on the audit change
    #[arg(long)]
    pub reason: Option<String>,
}

/// Attributes the data file already provides for the name
#[derive(clap::Args, Debug, Clone, Default)]
pub struct HintArgs {
    /// Nationality of a platform
    #[arg(long)]
    pub nationality: Option<String>,

    /// Class of a platform
    #[arg(long)]
    pub platform_type: Option<String>,

    /// Type of a sensor
    #[arg(long)]
    pub sensor_type: Option<String>,

    /// Type of a datafile
    #[arg(long)]
    pub datafile_type: Option<String>,

    /// Classification of the new entity
    #[arg(long)]
    pub privacy: Option<String>,

    /// Host platform of a sensor
    #[arg(long)]
    pub host: Option<String>,

    /// Platform trigraph
    #[arg(long)]
    pub trigraph: Option<String>,

    /// Platform quadgraph
    #[arg(long)]
    pub quadgraph: Option<String>,

    /// Platform pennant number
    #[arg(long = "pennant")]
    pub pennant_number: Option<String>,
}

impl From<HintArgs> for Hints {
    fn from(args: HintArgs) -> Self {
        Hints {
            nationality: args.nationality,
            platform_type: args.platform_type,
            sensor_type: args.sensor_type,
            datafile_type: args.datafile_type,
            privacy: args.privacy,
            host: args.host,
            trigraph: args.trigraph,
            quadgraph: args.quadgraph,
            pennant_number: args.pennant_number,
        }
    }
}

pub fn run(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut db = open_store(&config)?;
    let mut session = ImportSession::new(resolver_for(&config));

    let reason = args.reason.clone().unwrap_or_else(|| match &args.name {
        Some(name) => format!("resolve {} '{}'", args.kind, name),
        None => format!("resolve {}", args.kind),
    });
    let change = Change::new(config.author(), reason);
    let hints = Hints::from(args.hints);

    let entity = session.unit(&mut db, &change, |scope| {
        scope.resolve(args.kind, args.name.as_deref(), &hints)
    })?;

    print_resolved(&entity, global)
}

fn print_resolved(entity: &ResolvedEntity, global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entity).into_diagnostic()?);
        }
        OutputFormat::Tsv => println!("{}\t{}\t{}", entity.id, entity.kind, entity.name),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["id", "kind", "name"]).into_diagnostic()?;
            wtr.write_record([entity.id.to_string(), entity.kind.to_string(), entity.name.clone()])
                .into_diagnostic()?;
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Id => println!("{}", entity.id),
        OutputFormat::Auto => {
            println!(
                "{} {} {}",
                style("✓").green(),
                style(&entity.id).cyan(),
                style(&entity.name).bold()
            );
        }
    }
    Ok(())
}
