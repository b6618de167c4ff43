//! `tir config` command - Configuration
//!
//! Configuration is layered: built-in defaults, the global config file, the
//! file named by `TIR_CONFIG`, `TIR_*` environment variables, then flags.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::{Config, DefaultNames, EntityKind};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration as YAML
    Show,

    /// Show paths to configuration files
    Path,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let yaml = serde_yml::to_string(&effective(&config)).into_diagnostic()?;
    print!("{}", yaml);
    Ok(())
}

/// Every setting filled in with the value actually in force
fn effective(config: &Config) -> Config {
    let mut defaults = DefaultNames::default();
    for &kind in EntityKind::all() {
        let name = Some(config.defaults.name(kind).to_string());
        match kind {
            EntityKind::Platform => defaults.platform = name,
            EntityKind::Sensor => defaults.sensor = name,
            EntityKind::Datafile => defaults.datafile = name,
            EntityKind::Nationality => defaults.nationality = name,
            EntityKind::PlatformType => defaults.platform_type = name,
            EntityKind::SensorType => defaults.sensor_type = name,
            EntityKind::DatafileType => defaults.datafile_type = name,
            EntityKind::Privacy => defaults.privacy = name,
        }
    }

    Config {
        database: Some(config.database()),
        resolver: Some(config.resolver()),
        author: Some(config.author()),
        defaults,
    }
}

fn run_path() -> Result<()> {
    match Config::global_config_path() {
        Some(path) => {
            let marker = if path.exists() {
                style("(exists)").green()
            } else {
                style("(not found)").dim()
            };
            println!("Global:   {} {}", path.display(), marker);
        }
        None => println!("Global:   {}", style("(no home directory)").dim()),
    }
    match std::env::var_os("TIR_CONFIG") {
        Some(path) => println!("Override: {}", std::path::Path::new(&path).display()),
        None => println!("Override: {}", style("(TIR_CONFIG not set)").dim()),
    }
    Ok(())
}
