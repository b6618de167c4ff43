//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::Result;
use std::collections::HashMap;

use crate::cli::GlobalOpts;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::store::{EntityStore, SqliteStore};
use crate::core::Config;

/// Load the layered configuration, then apply command-line overrides
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(database) = &global.database {
        config.database = Some(database.clone());
    }
    if let Some(resolver) = global.resolver {
        config.resolver = Some(resolver);
    }
    Ok(config)
}

/// Open (creating if needed) the configured entity store
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.database();
    SqliteStore::open(&path).map_err(|e| {
        miette::miette!("Failed to open entity store {}: {}", path.display(), e)
    })
}

/// Names of every entity of the given kinds, keyed by ID
///
/// Used to show referenced entities by name in listings.
pub fn names_by_id(
    store: &dyn EntityStore,
    kinds: &[EntityKind],
) -> Result<HashMap<EntityId, String>> {
    let mut names = HashMap::new();
    for &kind in kinds {
        for stored in store.entities(kind).map_err(|e| miette::miette!("{}", e))? {
            names.insert(stored.entity.id, stored.entity.name);
        }
    }
    Ok(names)
}

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
/// This provides a consistent display format across all list/table outputs.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
