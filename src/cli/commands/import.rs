//! `tir import` command - Resolve every name in CSV manifests
//!
//! A manifest has a `kind` and a `name` column plus optional hint columns
//! (`nationality`, `platform_type`, `sensor_type`, `datafile_type`, `privacy`,
//! `host`, `trigraph`, `quadgraph`, `pennant_number`). Each file is imported in
//! one unit: either every name in it is resolved or nothing is written.

use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cli::helpers::{load_config, open_store};
use crate::cli::GlobalOpts;
use crate::core::{Change, EntityKind, Hints, SqliteStore};
use crate::resolve::{resolver_for, ImportSession, ResolutionRequest, ResolveError};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV manifest, or a directory of manifests
    pub path: PathBuf,

    /// Also import manifests in subdirectories
    #[arg(long)]
    pub descend: bool,
}

/// Import statistics
#[derive(Default)]
struct ImportStats {
    files_imported: usize,
    rows_resolved: usize,
    entities_created: usize,
    synonyms_created: usize,
    aborted: Vec<PathBuf>,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if !args.path.exists() {
        return Err(miette::miette!("Path not found: {}", args.path.display()));
    }

    let config = load_config(global)?;
    let files = collect_manifests(&args.path, args.descend)?;
    if files.is_empty() {
        println!(
            "{} No CSV manifests found in {}",
            style("!").yellow(),
            style(args.path.display()).cyan()
        );
        return Ok(());
    }

    let mut db = open_store(&config)?;
    let mut session = ImportSession::new(resolver_for(&config));
    let (entities_before, synonyms_before) = totals(&db)?;
    let mut stats = ImportStats::default();

    for file in &files {
        let requests = read_manifest(file)?;
        let change = Change::new(config.author(), format!("import {}", file.display()));

        let result = session.unit(&mut db, &change, |scope| {
            for request in &requests {
                scope.resolve_request(request)?;
            }
            Ok(requests.len())
        });

        match result {
            Ok(rows) => {
                stats.files_imported += 1;
                stats.rows_resolved += rows;
                if !global.quiet {
                    println!(
                        "{} {} ({} rows)",
                        style("✓").green(),
                        style(file.display()).cyan(),
                        rows
                    );
                }
            }
            Err(ResolveError::AbortedByOperator { kind }) => {
                warn!(file = %file.display(), %kind, "import aborted by operator, file rolled back");
                eprintln!(
                    "{} {}: aborted while resolving {}, nothing imported from this file",
                    style("✗").red(),
                    style(file.display()).cyan(),
                    kind
                );
                stats.aborted.push(file.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let cache = session.cache().stats();
    debug!(
        hits = cache.hits,
        misses = cache.misses,
        entries = cache.entries,
        "resolution cache"
    );

    let (entities_after, synonyms_after) = totals(&db)?;
    stats.entities_created = entities_after.saturating_sub(entities_before);
    stats.synonyms_created = synonyms_after.saturating_sub(synonyms_before);

    print_summary(&stats);
    Ok(())
}

fn print_summary(stats: &ImportStats) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Files imported:   {}", style(stats.files_imported).cyan());
    println!("  Rows resolved:    {}", style(stats.rows_resolved).cyan());
    println!("  Entities created: {}", style(stats.entities_created).green());
    if stats.synonyms_created > 0 {
        println!("  Synonyms added:   {}", style(stats.synonyms_created).green());
    }
    if !stats.aborted.is_empty() {
        println!("  Files aborted:    {}", style(stats.aborted.len()).red());
        for file in &stats.aborted {
            println!("    {}", style(file.display()).dim());
        }
    }
}

/// Entity and synonym totals, to report what an import added
fn totals(db: &SqliteStore) -> Result<(usize, usize)> {
    let counts = db
        .store()
        .counts()
        .map_err(|e| miette::miette!("{}", e))?;
    let entities: usize = counts.entities.iter().map(|(_, n)| n).sum();
    Ok((entities, counts.synonyms))
}

/// CSV files under `path` in name order; `path` itself if it is a file
fn collect_manifests(path: &Path, descend: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let max_depth = if descend { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.into_diagnostic()?;
        let is_csv = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if entry.file_type().is_file() && is_csv {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parse a manifest into resolution requests, one per row
fn read_manifest(path: &Path) -> Result<Vec<ResolutionRequest>> {
    let file = File::open(path).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("kind") {
        return Err(miette::miette!(
            "{}: missing required column 'kind'",
            path.display()
        ));
    }

    let mut requests = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // +2 for 1-indexed and header row
        let record = result.map_err(|e| {
            miette::miette!("{}: CSV parse error at row {}: {}", path.display(), row_num, e)
        })?;

        let kind = get_field(&record, &header_map, "kind").ok_or_else(|| {
            miette::miette!("{}: missing kind at row {}", path.display(), row_num)
        })?;
        let kind: EntityKind = kind.parse().map_err(|e| {
            miette::miette!("{}: row {}: {}", path.display(), row_num, e)
        })?;

        let field = |name: &str| get_field(&record, &header_map, name);
        let hints = Hints {
            nationality: field("nationality"),
            platform_type: field("platform_type").or_else(|| field("class")),
            sensor_type: field("sensor_type"),
            datafile_type: field("datafile_type"),
            privacy: field("privacy").or_else(|| field("classification")),
            host: field("host"),
            trigraph: field("trigraph"),
            quadgraph: field("quadgraph"),
            pennant_number: field("pennant_number").or_else(|| field("pennant")),
        };

        requests.push(ResolutionRequest::new(kind, field("name").as_deref(), hints));
    }
    Ok(requests)
}

/// Map normalized header names to column indices
fn build_header_map(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase().replace([' ', '-'], "_"), i))
        .collect()
}

/// Get a field value from a CSV record
fn get_field(
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "Kind,Name,Nationality,Platform Type,Pennant\n\
             platform,HMS Foo,UK,Frigate,F12\n\
             sensor-type,,,,\n",
        )
        .unwrap();

        let requests = read_manifest(&path).unwrap();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].kind, EntityKind::Platform);
        assert_eq!(requests[0].name.as_deref(), Some("HMS Foo"));
        assert_eq!(requests[0].hints.nationality.as_deref(), Some("UK"));
        assert_eq!(requests[0].hints.platform_type.as_deref(), Some("Frigate"));
        assert_eq!(requests[0].hints.pennant_number.as_deref(), Some("F12"));

        assert_eq!(requests[1].kind, EntityKind::SensorType);
        assert!(requests[1].key().is_none());
    }

    #[test]
    fn test_read_manifest_rejects_unknown_kind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "kind,name\nsubmarine,HMS Foo\n").unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_read_manifest_requires_kind_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "name\nHMS Foo\n").unwrap();

        assert!(read_manifest(&path).is_err());
    }

    #[test]
    fn test_collect_manifests() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "kind,name\n").unwrap();
        fs::write(dir.path().join("a.CSV"), "kind,name\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.csv"), "kind,name\n").unwrap();

        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
                .collect()
        };

        let shallow = collect_manifests(dir.path(), false).unwrap();
        assert_eq!(names(shallow), vec!["a.CSV", "b.csv"]);

        let deep = collect_manifests(dir.path(), true).unwrap();
        assert_eq!(names(deep), vec!["a.CSV", "b.csv", "c.csv"]);

        let single = collect_manifests(&dir.path().join("b.csv"), false).unwrap();
        assert_eq!(names(single), vec!["b.csv"]);
    }
}
