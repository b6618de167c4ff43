//! Query and insert methods of the SQLite store

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, parse_datetime, EntityStore, SqlStore, StoreCounts, StoreError};
use crate::core::audit::{Change, ChangeId};
use crate::core::entity::{
    Attributes, DatafileAttributes, NewEntity, PlatformAttributes, ResolvedEntity,
    SensorAttributes, StoredEntity, Synonym,
};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::name::NameKey;

const ENTITY_COLUMNS: &str = r#"
    SELECT e.id, e.kind, e.name, e.change_id, e.created,
           p.trigraph, p.quadgraph, p.pennant_number,
           p.nationality_id, p.platform_type_id, p.privacy_id,
           s.sensor_type_id, s.privacy_id, s.host_id,
           d.datafile_type_id, d.privacy_id
    FROM entities e
    LEFT JOIN platforms p ON p.id = e.id
    LEFT JOIN sensors s ON s.id = e.id
    LEFT JOIN datafiles d ON d.id = e.id
"#;

/// Raw columns of one entity row, converted outside the rusqlite closure
struct EntityRow {
    id: String,
    kind: String,
    name: String,
    change_id: String,
    created: String,
    trigraph: Option<String>,
    quadgraph: Option<String>,
    pennant_number: Option<String>,
    nationality_id: Option<String>,
    platform_type_id: Option<String>,
    platform_privacy_id: Option<String>,
    sensor_type_id: Option<String>,
    sensor_privacy_id: Option<String>,
    host_id: Option<String>,
    datafile_type_id: Option<String>,
    datafile_privacy_id: Option<String>,
}

impl EntityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            change_id: row.get(3)?,
            created: row.get(4)?,
            trigraph: row.get(5)?,
            quadgraph: row.get(6)?,
            pennant_number: row.get(7)?,
            nationality_id: row.get(8)?,
            platform_type_id: row.get(9)?,
            platform_privacy_id: row.get(10)?,
            sensor_type_id: row.get(11)?,
            sensor_privacy_id: row.get(12)?,
            host_id: row.get(13)?,
            datafile_type_id: row.get(14)?,
            datafile_privacy_id: row.get(15)?,
        })
    }

    fn into_stored(self) -> Result<StoredEntity, StoreError> {
        let kind: EntityKind = self.kind.parse()?;
        let id = EntityId::parse(&self.id)?;
        let missing = |column: &str| StoreError::AttributeMismatch {
            kind,
            reason: format!("{} has no {}", id, column),
        };

        let attributes = match kind {
            EntityKind::Platform => Attributes::Platform(PlatformAttributes {
                trigraph: self.trigraph,
                quadgraph: self.quadgraph,
                pennant_number: self.pennant_number,
                nationality: parse_ref(self.nationality_id)?.ok_or_else(|| missing("nationality"))?,
                platform_type: parse_ref(self.platform_type_id)?
                    .ok_or_else(|| missing("platform type"))?,
                privacy: parse_ref(self.platform_privacy_id)?.ok_or_else(|| missing("privacy"))?,
            }),
            EntityKind::Sensor => Attributes::Sensor(SensorAttributes {
                sensor_type: parse_ref(self.sensor_type_id)?.ok_or_else(|| missing("sensor type"))?,
                privacy: parse_ref(self.sensor_privacy_id)?.ok_or_else(|| missing("privacy"))?,
                host: parse_ref(self.host_id)?,
            }),
            EntityKind::Datafile => Attributes::Datafile(DatafileAttributes {
                datafile_type: parse_ref(self.datafile_type_id)?
                    .ok_or_else(|| missing("datafile type"))?,
                privacy: parse_ref(self.datafile_privacy_id)?.ok_or_else(|| missing("privacy"))?,
            }),
            _ => Attributes::Reference,
        };

        Ok(StoredEntity {
            entity: ResolvedEntity {
                kind,
                id,
                name: self.name,
            },
            attributes,
            change: self.change_id.parse()?,
            created: parse_datetime(&self.created),
        })
    }
}

fn parse_ref(column: Option<String>) -> Result<Option<EntityId>, StoreError> {
    column
        .map(|s| EntityId::parse(&s))
        .transpose()
        .map_err(StoreError::from)
}

/// Check that attributes match the kind and reference entities of the right kinds
fn validate_attributes(kind: EntityKind, attributes: &Attributes) -> Result<(), StoreError> {
    if !attributes.fits(kind) {
        return Err(StoreError::AttributeMismatch {
            kind,
            reason: "wrong attribute set".to_string(),
        });
    }

    let expected: Vec<(EntityId, EntityKind)> = match attributes {
        Attributes::Reference => Vec::new(),
        Attributes::Platform(p) => vec![
            (p.nationality, EntityKind::Nationality),
            (p.platform_type, EntityKind::PlatformType),
            (p.privacy, EntityKind::Privacy),
        ],
        Attributes::Sensor(s) => {
            let mut refs = vec![
                (s.sensor_type, EntityKind::SensorType),
                (s.privacy, EntityKind::Privacy),
            ];
            refs.extend(s.host.map(|host| (host, EntityKind::Platform)));
            refs
        }
        Attributes::Datafile(d) => vec![
            (d.datafile_type, EntityKind::DatafileType),
            (d.privacy, EntityKind::Privacy),
        ],
    };

    match expected.into_iter().find(|(id, want)| id.kind() != *want) {
        Some((id, want)) => Err(StoreError::AttributeMismatch {
            kind,
            reason: format!("{} is not a {}", id, want),
        }),
        None => Ok(()),
    }
}

impl SqlStore<'_> {
    fn query_entities(
        &self,
        filter: &str,
        param: &str,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        let sql = format!("{} WHERE {} ORDER BY e.seq", ENTITY_COLUMNS, filter);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![param], EntityRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EntityRow::into_stored).collect()
    }

    fn insert_entity(
        &self,
        id: &EntityId,
        entity: &NewEntity,
        name: &NameKey,
        change: &ChangeId,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO entities (id, kind, name, change_id, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    entity.kind.as_str(),
                    name.as_str(),
                    change.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        kind: entity.kind,
                        name: name.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        match &entity.attributes {
            Attributes::Reference => {}
            Attributes::Platform(p) => {
                self.conn.execute(
                    r#"INSERT INTO platforms
                       (id, trigraph, quadgraph, pennant_number, nationality_id, platform_type_id, privacy_id)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        id.to_string(),
                        p.trigraph,
                        p.quadgraph,
                        p.pennant_number,
                        p.nationality.to_string(),
                        p.platform_type.to_string(),
                        p.privacy.to_string()
                    ],
                )?;
            }
            Attributes::Sensor(s) => {
                self.conn.execute(
                    "INSERT INTO sensors (id, sensor_type_id, privacy_id, host_id) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        id.to_string(),
                        s.sensor_type.to_string(),
                        s.privacy.to_string(),
                        s.host.map(|h| h.to_string())
                    ],
                )?;
            }
            Attributes::Datafile(d) => {
                self.conn.execute(
                    "INSERT INTO datafiles (id, datafile_type_id, privacy_id) VALUES (?1, ?2, ?3)",
                    params![
                        id.to_string(),
                        d.datafile_type.to_string(),
                        d.privacy.to_string()
                    ],
                )?;
            }
        }
        Ok(())
    }

    /// All audit changes in the order they were recorded
    pub fn changes(&self) -> Result<Vec<Change>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user, reason, created FROM changes ORDER BY seq")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, user, reason, created)| -> Result<Change, StoreError> {
                Ok(Change {
                    id: id.parse()?,
                    user,
                    reason,
                    created: parse_datetime(&created),
                })
            })
            .collect()
    }

    /// Row counts per kind, plus synonyms and changes
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM entities GROUP BY kind")?;
        let by_kind = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entities: Vec<(EntityKind, usize)> =
            EntityKind::all().iter().map(|kind| (*kind, 0)).collect();
        for (kind, count) in by_kind {
            let kind: EntityKind = kind.parse()?;
            if let Some(slot) = entities.iter_mut().find(|(k, _)| *k == kind) {
                slot.1 = count as usize;
            }
        }

        let synonyms: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM synonyms", [], |row| row.get(0))?;
        let changes: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM changes", [], |row| row.get(0))?;

        Ok(StoreCounts {
            entities,
            synonyms: synonyms as usize,
            changes: changes as usize,
        })
    }
}

impl EntityStore for SqlStore<'_> {
    fn find_by_name(
        &self,
        kind: EntityKind,
        name: &NameKey,
    ) -> Result<Option<ResolvedEntity>, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT id, name FROM entities WHERE kind = ?1 AND name = ?2",
                params![kind.as_str(), name.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        found
            .map(|(id, name)| -> Result<ResolvedEntity, StoreError> {
                Ok(ResolvedEntity {
                    kind,
                    id: EntityId::parse(&id)?,
                    name,
                })
            })
            .transpose()
    }

    fn find_by_synonym(
        &self,
        kind: EntityKind,
        alias: &NameKey,
    ) -> Result<Option<ResolvedEntity>, StoreError> {
        let found = self
            .conn
            .query_row(
                r#"SELECT e.id, e.name FROM synonyms s
                   JOIN entities e ON e.id = s.entity_id
                   WHERE s.kind = ?1 AND s.alias = ?2"#,
                params![kind.as_str(), alias.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        found
            .map(|(id, name)| -> Result<ResolvedEntity, StoreError> {
                Ok(ResolvedEntity {
                    kind,
                    id: EntityId::parse(&id)?,
                    name,
                })
            })
            .transpose()
    }

    fn create(&self, entity: &NewEntity, change: &ChangeId) -> Result<ResolvedEntity, StoreError> {
        let name = NameKey::new(&entity.name).ok_or_else(|| StoreError::AttributeMismatch {
            kind: entity.kind,
            reason: "name is empty".to_string(),
        })?;
        validate_attributes(entity.kind, &entity.attributes)?;

        let id = EntityId::new(entity.kind);

        // The entity row and its detail row land together or not at all
        self.conn.execute_batch("SAVEPOINT create_entity")?;
        match self.insert_entity(&id, entity, &name, change) {
            Ok(()) => {
                self.conn.execute_batch("RELEASE create_entity")?;
                Ok(ResolvedEntity {
                    kind: entity.kind,
                    id,
                    name: name.to_string(),
                })
            }
            Err(e) => {
                self.conn
                    .execute_batch("ROLLBACK TO create_entity; RELEASE create_entity")?;
                Err(e)
            }
        }
    }

    fn add_synonym(
        &self,
        kind: EntityKind,
        alias: &NameKey,
        entity: &EntityId,
        change: &ChangeId,
    ) -> Result<(), StoreError> {
        if entity.kind() != kind {
            return Err(StoreError::AttributeMismatch {
                kind,
                reason: format!("synonym target {} is not a {}", entity, kind),
            });
        }

        self.conn
            .execute(
                "INSERT INTO synonyms (kind, alias, entity_id, change_id, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    kind.as_str(),
                    alias.as_str(),
                    entity.to_string(),
                    change.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        kind,
                        name: alias.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    fn entities(&self, kind: EntityKind) -> Result<Vec<StoredEntity>, StoreError> {
        self.query_entities("e.kind = ?1", kind.as_str())
    }

    fn get(&self, id: &EntityId) -> Result<Option<StoredEntity>, StoreError> {
        Ok(self
            .query_entities("e.id = ?1", &id.to_string())?
            .into_iter()
            .next())
    }

    fn synonyms(&self, kind: Option<EntityKind>) -> Result<Vec<Synonym>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT kind, alias, entity_id, change_id, created FROM synonyms
               WHERE ?1 IS NULL OR kind = ?1
               ORDER BY seq"#,
        )?;
        let rows = stmt
            .query_map(params![kind.map(|k| k.as_str())], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, alias, entity, change, created)| -> Result<Synonym, StoreError> {
                Ok(Synonym {
                    kind: kind.parse()?,
                    alias,
                    entity: EntityId::parse(&entity)?,
                    change: change.parse()?,
                    created: parse_datetime(&created),
                })
            })
            .collect()
    }
}
