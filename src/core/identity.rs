//! Entity identity system using kind-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// The kinds of canonical entity an import can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// A vessel, aircraft or other tracked thing
    Platform,
    /// A sensor carried by a platform
    Sensor,
    /// An imported data file
    Datafile,
    /// Platform nationality
    Nationality,
    /// Platform class (e.g. "Warship")
    PlatformType,
    /// Sensor class (e.g. "Position")
    SensorType,
    /// Datafile format class
    DatafileType,
    /// Privacy classification
    Privacy,
}

impl EntityKind {
    /// Get the string stored in the database and accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Platform => "platform",
            EntityKind::Sensor => "sensor",
            EntityKind::Datafile => "datafile",
            EntityKind::Nationality => "nationality",
            EntityKind::PlatformType => "platform-type",
            EntityKind::SensorType => "sensor-type",
            EntityKind::DatafileType => "datafile-type",
            EntityKind::Privacy => "privacy",
        }
    }

    /// Get the ID prefix used for entities of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Platform => "PLT",
            EntityKind::Sensor => "SNS",
            EntityKind::Datafile => "DAT",
            EntityKind::Nationality => "NAT",
            EntityKind::PlatformType => "PTY",
            EntityKind::SensorType => "STY",
            EntityKind::DatafileType => "DTY",
            EntityKind::Privacy => "PRV",
        }
    }

    /// Human wording used in operator menus
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::PlatformType => "platform type",
            EntityKind::SensorType => "sensor type",
            EntityKind::DatafileType => "datafile type",
            EntityKind::Privacy => "classification",
            other => other.as_str(),
        }
    }

    /// Get all kinds, metadata kinds first
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Platform,
            EntityKind::Sensor,
            EntityKind::Datafile,
            EntityKind::Nationality,
            EntityKind::PlatformType,
            EntityKind::SensorType,
            EntityKind::DatafileType,
            EntityKind::Privacy,
        ]
    }

    /// Reference kinds carry nothing but a name
    pub fn is_reference(&self) -> bool {
        !matches!(
            self,
            EntityKind::Platform | EntityKind::Sensor | EntityKind::Datafile
        )
    }

    /// Kinds that must be resolved before an entity of this kind can be created
    pub fn dependencies(&self) -> &'static [EntityKind] {
        match self {
            EntityKind::Platform => &[
                EntityKind::Nationality,
                EntityKind::PlatformType,
                EntityKind::Privacy,
            ],
            EntityKind::Sensor => &[EntityKind::SensorType, EntityKind::Privacy],
            EntityKind::Datafile => &[EntityKind::DatafileType, EntityKind::Privacy],
            _ => &[],
        }
    }

    /// Look a kind up by its ID prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.prefix().eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "platform" => Ok(EntityKind::Platform),
            "sensor" => Ok(EntityKind::Sensor),
            "datafile" => Ok(EntityKind::Datafile),
            "nationality" => Ok(EntityKind::Nationality),
            "platform-type" => Ok(EntityKind::PlatformType),
            "sensor-type" => Ok(EntityKind::SensorType),
            "datafile-type" => Ok(EntityKind::DatafileType),
            "privacy" | "classification" => Ok(EntityKind::Privacy),
            other => Self::from_prefix(other).ok_or_else(|| IdParseError::InvalidKind(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a kind prefix and ULID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    kind: EntityKind,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId for the given kind
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ulid: Ulid::new(),
        }
    }

    /// Get the entity kind
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let kind = EntityKind::from_prefix(prefix_str)
            .ok_or_else(|| IdParseError::InvalidPrefix(prefix_str.to_string()))?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { kind, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing kinds and identifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("missing '-' delimiter in ID: {0}")]
    MissingDelimiter(String),

    #[error("invalid ID prefix: {0}")]
    InvalidPrefix(String),

    #[error("unknown entity kind: '{0}' (expected one of platform, sensor, datafile, nationality, platform-type, sensor-type, datafile-type, privacy)")]
    InvalidKind(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(EntityKind::Platform);
        let s = id.to_string();
        assert!(s.starts_with("PLT-"));

        let parsed: EntityId = s.parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.kind(), EntityKind::Platform);
    }

    #[test]
    fn test_entity_id_rejects_unknown_prefix() {
        let err = EntityId::parse("XYZ-01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap_err();
        assert_eq!(err, IdParseError::InvalidPrefix("XYZ".to_string()));

        let err = EntityId::parse("PLT01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_kind_parsing_accepts_aliases() {
        assert_eq!("platform".parse::<EntityKind>().unwrap(), EntityKind::Platform);
        assert_eq!("Platform_Type".parse::<EntityKind>().unwrap(), EntityKind::PlatformType);
        assert_eq!("classification".parse::<EntityKind>().unwrap(), EntityKind::Privacy);
        assert_eq!("nat".parse::<EntityKind>().unwrap(), EntityKind::Nationality);
        assert!("vessel".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_kind_strings_roundtrip() {
        for kind in EntityKind::all() {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), *kind);
            assert_eq!(EntityKind::from_prefix(kind.prefix()), Some(*kind));
        }
    }

    #[test]
    fn test_reference_kinds_have_no_dependencies() {
        for kind in EntityKind::all() {
            assert_eq!(kind.is_reference(), kind.dependencies().is_empty());
        }
    }
}
