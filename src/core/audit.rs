//! Audit changes
//!
//! Every import unit records one [`Change`]; each entity and synonym created
//! while resolving that unit carries the change's ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::core::identity::IdParseError;

const CHANGE_PREFIX: &str = "CHG";

/// Identifier of an audit change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeId(Ulid);

impl ChangeId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", CHANGE_PREFIX, self.0)
    }
}

impl FromStr for ChangeId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;
        if prefix != CHANGE_PREFIX {
            return Err(IdParseError::InvalidPrefix(prefix.to_string()));
        }
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;
        Ok(Self(ulid))
    }
}

impl Serialize for ChangeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChangeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An audit record tagging everything created by one import unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub id: ChangeId,
    pub user: String,
    pub reason: String,
    pub created: DateTime<Utc>,
}

impl Change {
    pub fn new(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: ChangeId::new(),
            user: user.into(),
            reason: reason.into(),
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_id_roundtrip() {
        let id = ChangeId::new();
        let s = id.to_string();
        assert!(s.starts_with("CHG-"));
        assert_eq!(s.parse::<ChangeId>().unwrap(), id);
    }

    #[test]
    fn test_change_id_rejects_entity_ids() {
        let err = "PLT-01ARZ3NDEKTSV4RRFFQ69G5FAV".parse::<ChangeId>().unwrap_err();
        assert_eq!(err, IdParseError::InvalidPrefix("PLT".to_string()));
    }
}
