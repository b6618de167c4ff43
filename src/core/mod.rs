//! Core module - fundamental types and utilities

pub mod audit;
pub mod config;
pub mod entity;
pub mod identity;
pub mod name;
pub mod store;

pub use audit::{Change, ChangeId};
pub use config::{Config, ConfigError, DefaultNames, ResolverKind};
pub use entity::{
    abbreviate, Attributes, DatafileAttributes, Hints, NewEntity, PlatformAttributes,
    ResolvedEntity, SensorAttributes, StoredEntity, Synonym,
};
pub use identity::{EntityId, EntityKind, IdParseError};
pub use name::NameKey;
pub use store::{EntityStore, SqlStore, SqliteStore, StoreCounts, StoreError, Unit};
