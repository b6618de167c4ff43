//! Canonical entities, their attributes, and resolution hints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::audit::ChangeId;
use crate::core::identity::{EntityId, EntityKind};

/// Handle to a canonical entity returned by resolution
///
/// The store owns the row; callers and cache entries only hold this handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedEntity {
    pub kind: EntityKind,
    pub id: EntityId,
    pub name: String,
}

impl fmt::Display for ResolvedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.id)
    }
}

/// Platform-specific columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformAttributes {
    pub trigraph: Option<String>,
    pub quadgraph: Option<String>,
    pub pennant_number: Option<String>,
    pub nationality: EntityId,
    pub platform_type: EntityId,
    pub privacy: EntityId,
}

/// Leading characters of a platform name, used for default trigraphs and quadgraphs
pub fn abbreviate(name: &str, len: usize) -> String {
    name.chars().take(len).collect::<String>().trim_end().to_string()
}

/// Sensor-specific columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorAttributes {
    pub sensor_type: EntityId,
    pub privacy: EntityId,
    pub host: Option<EntityId>,
}

/// Datafile-specific columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatafileAttributes {
    pub datafile_type: EntityId,
    pub privacy: EntityId,
}

/// Kind-specific attributes of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attributes {
    /// Reference kinds have a name and nothing else
    Reference,
    Platform(PlatformAttributes),
    Sensor(SensorAttributes),
    Datafile(DatafileAttributes),
}

impl Attributes {
    /// Check that this attribute set is the one `kind` requires
    pub fn fits(&self, kind: EntityKind) -> bool {
        match self {
            Attributes::Reference => kind.is_reference(),
            Attributes::Platform(_) => kind == EntityKind::Platform,
            Attributes::Sensor(_) => kind == EntityKind::Sensor,
            Attributes::Datafile(_) => kind == EntityKind::Datafile,
        }
    }
}

/// An entity about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub name: String,
    pub attributes: Attributes,
}

impl NewEntity {
    /// A name-only entity of a reference kind
    pub fn reference(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes: Attributes::Reference,
        }
    }
}

/// An entity row as read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEntity {
    #[serde(flatten)]
    pub entity: ResolvedEntity,
    pub attributes: Attributes,
    pub change: ChangeId,
    pub created: DateTime<Utc>,
}

/// An alternate spelling mapped to a canonical entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synonym {
    pub kind: EntityKind,
    pub alias: String,
    pub entity: EntityId,
    pub change: ChangeId,
    pub created: DateTime<Utc>,
}

/// Partial attributes extracted by a file parser alongside a raw name
///
/// A hinted dependency name bypasses the interactive sub-resolution for that
/// dependency and is looked up (or created) directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hints {
    pub nationality: Option<String>,
    pub platform_type: Option<String>,
    pub sensor_type: Option<String>,
    pub datafile_type: Option<String>,
    pub privacy: Option<String>,
    /// Host platform of a sensor
    pub host: Option<String>,
    pub trigraph: Option<String>,
    pub quadgraph: Option<String>,
    pub pennant_number: Option<String>,
}

impl Hints {
    /// The hinted name for a dependency kind, if any
    pub fn dependency(&self, kind: EntityKind) -> Option<&str> {
        let hint = match kind {
            EntityKind::Nationality => &self.nationality,
            EntityKind::PlatformType => &self.platform_type,
            EntityKind::SensorType => &self.sensor_type,
            EntityKind::DatafileType => &self.datafile_type,
            EntityKind::Privacy => &self.privacy,
            EntityKind::Platform => &self.host,
            EntityKind::Sensor | EntityKind::Datafile => &None,
        };
        hint.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    pub fn with_nationality(mut self, name: impl Into<String>) -> Self {
        self.nationality = Some(name.into());
        self
    }

    pub fn with_platform_type(mut self, name: impl Into<String>) -> Self {
        self.platform_type = Some(name.into());
        self
    }

    pub fn with_sensor_type(mut self, name: impl Into<String>) -> Self {
        self.sensor_type = Some(name.into());
        self
    }

    pub fn with_datafile_type(mut self, name: impl Into<String>) -> Self {
        self.datafile_type = Some(name.into());
        self
    }

    pub fn with_privacy(mut self, name: impl Into<String>) -> Self {
        self.privacy = Some(name.into());
        self
    }

    pub fn with_host(mut self, name: impl Into<String>) -> Self {
        self.host = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_fit_their_kind() {
        assert!(Attributes::Reference.fits(EntityKind::Privacy));
        assert!(!Attributes::Reference.fits(EntityKind::Platform));

        let datafile = Attributes::Datafile(DatafileAttributes {
            datafile_type: EntityId::new(EntityKind::DatafileType),
            privacy: EntityId::new(EntityKind::Privacy),
        });
        assert!(datafile.fits(EntityKind::Datafile));
        assert!(!datafile.fits(EntityKind::Sensor));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("HMS Foo", 3), "HMS");
        assert_eq!(abbreviate("HMS Foo", 4), "HMS");
        assert_eq!(abbreviate("Nelson", 4), "Nels");
        assert_eq!(abbreviate("HÅ", 3), "HÅ");
    }

    #[test]
    fn test_blank_hints_are_ignored() {
        let hints = Hints::default().with_nationality("  ").with_privacy(" Public ");
        assert_eq!(hints.dependency(EntityKind::Nationality), None);
        assert_eq!(hints.dependency(EntityKind::Privacy), Some("Public"));
        assert_eq!(hints.dependency(EntityKind::Sensor), None);
    }
}
