//! `tir list` command - List canonical entities

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_short_id, load_config, names_by_id, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Attributes, EntityId, EntityKind, EntityStore, StoredEntity};

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Entity kind to list
    pub kind: EntityKind,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = open_store(&config)?;
    let store = db.store();

    let entities = store
        .entities(args.kind)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entities).into_diagnostic()?);
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        for stored in &entities {
            println!("{}", stored.entity.id);
        }
        return Ok(());
    }

    let mut referenced: Vec<EntityKind> = args.kind.dependencies().to_vec();
    if args.kind == EntityKind::Sensor {
        referenced.push(EntityKind::Platform);
    }
    let names = names_by_id(&store, &referenced)?;

    let header = columns(args.kind);
    let rows: Vec<Vec<String>> = entities.iter().map(|e| row(e, &names)).collect();

    match global.format {
        OutputFormat::Tsv => {
            println!("{}", header.join("\t"));
            for row in &rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(&header).into_diagnostic()?;
            for row in &rows {
                wtr.write_record(row).into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        _ => {
            if rows.is_empty() {
                println!("No {} entities found.", args.kind);
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(header.iter().map(|h| h.to_uppercase()));
            for (stored, row) in entities.iter().zip(&rows) {
                let mut cells = row.clone();
                cells[0] = format_short_id(&stored.entity.id);
                cells[1] = truncate_str(&cells[1], 40);
                builder.push_record(cells);
            }
            println!("{}", builder.build().with(Style::rounded()));
            if !global.quiet {
                println!();
                println!(
                    "{} {} {}(s) found",
                    style("→").blue(),
                    style(rows.len()).cyan(),
                    args.kind.label()
                );
            }
        }
    }
    Ok(())
}

fn columns(kind: EntityKind) -> Vec<&'static str> {
    match kind {
        EntityKind::Platform => vec![
            "id",
            "name",
            "trigraph",
            "quadgraph",
            "pennant_number",
            "nationality",
            "class",
            "classification",
        ],
        EntityKind::Sensor => vec!["id", "name", "type", "host", "classification"],
        EntityKind::Datafile => vec!["id", "reference", "type", "classification"],
        _ => vec!["id", "name", "created"],
    }
}

fn row(stored: &StoredEntity, names: &HashMap<EntityId, String>) -> Vec<String> {
    let name_of = |id: &EntityId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    let mut row = vec![stored.entity.id.to_string(), stored.entity.name.clone()];

    match &stored.attributes {
        Attributes::Platform(p) => {
            row.push(p.trigraph.clone().unwrap_or_default());
            row.push(p.quadgraph.clone().unwrap_or_default());
            row.push(p.pennant_number.clone().unwrap_or_default());
            row.push(name_of(&p.nationality));
            row.push(name_of(&p.platform_type));
            row.push(name_of(&p.privacy));
        }
        Attributes::Sensor(s) => {
            row.push(name_of(&s.sensor_type));
            row.push(s.host.as_ref().map(name_of).unwrap_or_default());
            row.push(name_of(&s.privacy));
        }
        Attributes::Datafile(d) => {
            row.push(name_of(&d.datafile_type));
            row.push(name_of(&d.privacy));
        }
        Attributes::Reference => {
            row.push(stored.created.format("%Y-%m-%d %H:%M").to_string());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Change, NewEntity, SensorAttributes, SqliteStore};

    #[test]
    fn test_rows_match_columns() {
        let db = SqliteStore::open_in_memory().unwrap();
        let store = db.store();
        let change = Change::new("tester", "list");
        store.record_change(&change).unwrap();

        let radar = store
            .create(&NewEntity::reference(EntityKind::SensorType, "Radar"), &change.id)
            .unwrap();
        let public = store
            .create(&NewEntity::reference(EntityKind::Privacy, "Public"), &change.id)
            .unwrap();
        store
            .create(
                &NewEntity {
                    kind: EntityKind::Sensor,
                    name: "Type 997".to_string(),
                    attributes: Attributes::Sensor(SensorAttributes {
                        sensor_type: radar.id,
                        privacy: public.id,
                        host: None,
                    }),
                },
                &change.id,
            )
            .unwrap();

        let names = names_by_id(&store, EntityKind::Sensor.dependencies()).unwrap();
        let sensors = store.entities(EntityKind::Sensor).unwrap();
        let cells = row(&sensors[0], &names);

        assert_eq!(cells.len(), columns(EntityKind::Sensor).len());
        assert_eq!(&cells[1..], ["Type 997", "Radar", "", "Public"]);

        let privacy = store.entities(EntityKind::Privacy).unwrap();
        assert_eq!(row_len(&privacy[0]), columns(EntityKind::Privacy).len());
    }

    fn row_len(stored: &StoredEntity) -> usize {
        row(stored, &HashMap::new()).len()
    }
}
