//! TIR: Track Import Resolver
//!
//! Maps the raw platform, sensor and reference names found in imported track
//! data to canonical entities in a SQLite store, either by asking an operator
//! through terminal menus or by applying fixed defaults.

pub mod cli;
pub mod core;
pub mod resolve;
