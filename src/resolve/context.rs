//! The resolution protocol shared by every resolver
//!
//! Lookup order is always: session cache, canonical name, synonym. Only a
//! miss reaches the resolver's policy. Creation searches again before it
//! inserts, and a uniqueness conflict from a concurrent writer is recovered by
//! searching once more and adopting the winner's entity.

use tracing::{debug, info, warn};

use super::cache::ResolutionCache;
use super::{Outcome, ResolutionRequest, ResolveError, Resolver};
use crate::core::audit::ChangeId;
use crate::core::entity::{NewEntity, ResolvedEntity};
use crate::core::identity::EntityKind;
use crate::core::name::NameKey;
use crate::core::store::EntityStore;

/// Everything a resolution needs from its surroundings
pub struct ResolveContext<'a> {
    store: &'a dyn EntityStore,
    cache: &'a mut ResolutionCache,
    change: ChangeId,
    depth: usize,
}

impl<'a> ResolveContext<'a> {
    /// Bind a store view, the session cache and the unit's audit change
    pub fn new(store: &'a dyn EntityStore, cache: &'a mut ResolutionCache, change: ChangeId) -> Self {
        Self {
            store,
            cache,
            change,
            depth: 0,
        }
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store
    }

    /// The audit change every write is tagged with
    pub fn change(&self) -> ChangeId {
        self.change
    }

    /// Nesting level: 0 for the file parser's request, 1+ for dependencies
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Resolve a parser's request; an abandoned resolution aborts the file
    pub fn resolve<R: Resolver + ?Sized>(
        &mut self,
        resolver: &mut R,
        request: &ResolutionRequest,
    ) -> Result<ResolvedEntity, ResolveError> {
        match self.resolve_outcome(resolver, request)? {
            Outcome::Resolved(entity) => Ok(entity),
            Outcome::Abandoned => Err(ResolveError::AbortedByOperator { kind: request.kind }),
        }
    }

    /// Resolve a dependency of the entity being built
    ///
    /// Abandoning a dependency only backs out to the enclosing menu, so the
    /// outcome is returned to the caller rather than turned into an error.
    pub fn resolve_dependency<R: Resolver + ?Sized>(
        &mut self,
        resolver: &mut R,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        self.depth += 1;
        let outcome = self.resolve_outcome(resolver, request);
        self.depth -= 1;
        outcome
    }

    fn resolve_outcome<R: Resolver + ?Sized>(
        &mut self,
        resolver: &mut R,
        request: &ResolutionRequest,
    ) -> Result<Outcome, ResolveError> {
        let key = request.key();
        if let Some(key) = &key {
            if let Some(found) = self.lookup(request.kind, key)? {
                return Ok(Outcome::Resolved(found));
            }
        }

        let outcome = resolver.dispatch(self, request)?;

        // Nameless requests are not cached; there is no name to key them by
        if let (Some(key), Outcome::Resolved(entity)) = (key, &outcome) {
            self.cache.store(request.kind, key, entity.clone());
        }
        Ok(outcome)
    }

    /// Cache, then canonical name, then synonym
    pub fn lookup(
        &mut self,
        kind: EntityKind,
        name: &NameKey,
    ) -> Result<Option<ResolvedEntity>, ResolveError> {
        if let Some(hit) = self.cache.lookup(kind, name) {
            debug!(%kind, name = %name, id = %hit.id, "cache hit");
            return Ok(Some(hit));
        }

        let found = self.find_existing(kind, name)?;
        if let Some(entity) = &found {
            self.cache.store(kind, name.clone(), entity.clone());
        }
        Ok(found)
    }

    /// Search the store by canonical name, then by synonym
    fn find_existing(
        &self,
        kind: EntityKind,
        name: &NameKey,
    ) -> Result<Option<ResolvedEntity>, ResolveError> {
        if let Some(entity) = self.store.find_by_name(kind, name)? {
            debug!(%kind, name = %name, id = %entity.id, "store hit");
            return Ok(Some(entity));
        }
        if let Some(entity) = self.store.find_by_synonym(kind, name)? {
            debug!(%kind, alias = %name, canonical = %entity.name, "synonym hit");
            return Ok(Some(entity));
        }
        Ok(None)
    }

    /// [`lookup`](Self::lookup), falling back to a unique case-insensitive name match
    ///
    /// Two or more case-insensitive matches are an [`ResolveError::AmbiguousName`].
    pub fn find_folded(
        &mut self,
        kind: EntityKind,
        name: &NameKey,
    ) -> Result<Option<ResolvedEntity>, ResolveError> {
        if let Some(found) = self.lookup(kind, name)? {
            return Ok(Some(found));
        }

        let mut matches = self.store.find_folded(kind, name)?;
        match matches.len() {
            0 => Ok(None),
            1 => {
                let entity = matches.remove(0);
                debug!(%kind, name = %name, canonical = %entity.name, "case-insensitive match");
                self.cache.store(kind, name.clone(), entity.clone());
                Ok(Some(entity))
            }
            _ => Err(ResolveError::AmbiguousName {
                kind,
                name: name.to_string(),
                matches: matches.into_iter().map(|e| e.name).collect(),
            }),
        }
    }

    /// Find a name-only entity, creating it when nothing matches
    pub fn get_or_create(
        &mut self,
        kind: EntityKind,
        name: &str,
    ) -> Result<ResolvedEntity, ResolveError> {
        let key = NameKey::new(name).ok_or(ResolveError::BlankName { kind })?;
        if let Some(found) = self.find_folded(kind, &key)? {
            return Ok(found);
        }
        self.create(NewEntity::reference(kind, key.as_str()))
    }

    /// Search, then insert; adopt a concurrent writer's entity on conflict
    ///
    /// A conflict is retried exactly once. A second conflict is a
    /// [`ResolveError::ConstraintViolation`].
    pub fn create(&mut self, new: NewEntity) -> Result<ResolvedEntity, ResolveError> {
        let kind = new.kind;
        let key = NameKey::new(&new.name).ok_or(ResolveError::BlankName { kind })?;

        if let Some(existing) = self.lookup(kind, &key)? {
            return Ok(existing);
        }

        match self.store.create(&new, &self.change) {
            Ok(entity) => return Ok(self.created(key, entity)),
            Err(e) if e.is_conflict() => {
                warn!(%kind, name = %key, "name taken by a concurrent writer, searching again");
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(existing) = self.find_existing(kind, &key)? {
            info!(%kind, name = %key, id = %existing.id, "adopted entity created concurrently");
            self.cache.store(kind, key, existing.clone());
            return Ok(existing);
        }

        match self.store.create(&new, &self.change) {
            Ok(entity) => Ok(self.created(key, entity)),
            Err(e) if e.is_conflict() => Err(ResolveError::ConstraintViolation {
                kind,
                name: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn created(&mut self, key: NameKey, entity: ResolvedEntity) -> ResolvedEntity {
        info!(kind = %entity.kind, name = %entity.name, id = %entity.id, change = %self.change, "created entity");
        self.cache.store(entity.kind, key, entity.clone());
        entity
    }

    /// Record `alias` as another name for `target`
    ///
    /// An alias must differ from the target's own name and must not be the
    /// canonical name of another entity. Recording an existing pair again is a
    /// no-op; moving an alias to a different entity is refused.
    pub fn add_synonym(
        &mut self,
        alias: &NameKey,
        target: &ResolvedEntity,
    ) -> Result<(), ResolveError> {
        let kind = target.kind;
        let invalid = |reason: String| ResolveError::InvalidSynonym {
            kind,
            alias: alias.to_string(),
            reason,
        };

        if NameKey::new(&target.name).as_ref() == Some(alias) {
            return Err(invalid("it is already the canonical name".to_string()));
        }
        if let Some(other) = self.store.find_by_name(kind, alias)? {
            if other.id != target.id {
                return Err(invalid(format!("it is the canonical name of {}", other.id)));
            }
        }
        if let Some(existing) = self.store.find_by_synonym(kind, alias)? {
            if existing.id == target.id {
                self.cache.store(kind, alias.clone(), target.clone());
                return Ok(());
            }
            return Err(invalid(format!("it already refers to '{}'", existing.name)));
        }

        match self.store.add_synonym(kind, alias, &target.id, &self.change) {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                // Another writer recorded the alias first; fine if it agrees with us
                match self.store.find_by_synonym(kind, alias)? {
                    Some(existing) if existing.id == target.id => {}
                    Some(existing) => {
                        return Err(invalid(format!("it already refers to '{}'", existing.name)))
                    }
                    None => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        info!(%kind, alias = %alias, canonical = %target.name, "recorded synonym");
        self.cache.store(kind, alias.clone(), target.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::Change;
    use crate::core::entity::{Attributes, StoredEntity, Synonym};
    use crate::core::identity::EntityId;
    use crate::core::store::{SqlStore, SqliteStore, StoreError};
    use crate::resolve::DefaultResolver;
    use crate::core::config::DefaultNames;
    use std::cell::Cell;

    fn key(name: &str) -> NameKey {
        NameKey::new(name).unwrap()
    }

    fn open() -> (SqliteStore, ChangeId) {
        let db = SqliteStore::open_in_memory().unwrap();
        let change = Change::new("tester", "context test");
        db.store().record_change(&change).unwrap();
        (db, change.id)
    }

    /// Lets a competing writer insert the same entity just before each create
    struct RacingStore<'a> {
        inner: SqlStore<'a>,
        races: Cell<usize>,
        /// Hide canonical names from searches, as if the competitor had not committed yet
        blind: bool,
    }

    impl EntityStore for RacingStore<'_> {
        fn find_by_name(
            &self,
            kind: EntityKind,
            name: &NameKey,
        ) -> Result<Option<ResolvedEntity>, StoreError> {
            if self.blind {
                return Ok(None);
            }
            self.inner.find_by_name(kind, name)
        }

        fn find_by_synonym(
            &self,
            kind: EntityKind,
            alias: &NameKey,
        ) -> Result<Option<ResolvedEntity>, StoreError> {
            self.inner.find_by_synonym(kind, alias)
        }

        fn create(&self, entity: &NewEntity, change: &ChangeId) -> Result<ResolvedEntity, StoreError> {
            if self.races.get() > 0 {
                self.races.set(self.races.get() - 1);
                self.inner.create(entity, change)?;
            }
            self.inner.create(entity, change)
        }

        fn add_synonym(
            &self,
            kind: EntityKind,
            alias: &NameKey,
            entity: &EntityId,
            change: &ChangeId,
        ) -> Result<(), StoreError> {
            self.inner.add_synonym(kind, alias, entity, change)
        }

        fn entities(&self, kind: EntityKind) -> Result<Vec<StoredEntity>, StoreError> {
            self.inner.entities(kind)
        }

        fn get(&self, id: &EntityId) -> Result<Option<StoredEntity>, StoreError> {
            self.inner.get(id)
        }

        fn synonyms(&self, kind: Option<EntityKind>) -> Result<Vec<Synonym>, StoreError> {
            self.inner.synonyms(kind)
        }
    }

    #[test]
    fn test_lookup_prefers_cache_then_name_then_synonym() {
        let (db, change) = open();
        let store = db.store();
        let uk = store
            .create(&NewEntity::reference(EntityKind::Nationality, "United Kingdom"), &change)
            .unwrap();
        store
            .add_synonym(EntityKind::Nationality, &key("GB"), &uk.id, &change)
            .unwrap();

        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);
        assert_eq!(cx.lookup(EntityKind::Nationality, &key("United Kingdom")).unwrap(), Some(uk.clone()));
        assert_eq!(cx.lookup(EntityKind::Nationality, &key("GB")).unwrap(), Some(uk.clone()));
        assert_eq!(cx.lookup(EntityKind::Nationality, &key("gb")).unwrap(), None);
        drop(cx);

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let (db, change) = open();
        let store = db.store();
        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);

        let err = cx.get_or_create(EntityKind::Privacy, "   ").unwrap_err();
        assert!(matches!(err, ResolveError::BlankName { kind: EntityKind::Privacy }));
        assert_eq!(err.to_string(), "a privacy name cannot be blank");

        let err = cx
            .create(NewEntity::reference(EntityKind::Nationality, ""))
            .unwrap_err();
        assert!(matches!(err, ResolveError::BlankName { kind: EntityKind::Nationality }));
        drop(cx);
        assert!(store.entities(EntityKind::Privacy).unwrap().is_empty());
    }

    #[test]
    fn test_find_folded_adopts_unique_match() {
        let (db, change) = open();
        let store = db.store();
        let uk = store
            .create(&NewEntity::reference(EntityKind::Nationality, "UK"), &change)
            .unwrap();

        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);
        assert_eq!(cx.find_folded(EntityKind::Nationality, &key("uk")).unwrap(), Some(uk));
    }

    #[test]
    fn test_find_folded_rejects_ambiguous_match() {
        let (db, change) = open();
        let store = db.store();
        for name in ["UK", "Uk"] {
            store
                .create(&NewEntity::reference(EntityKind::Nationality, name), &change)
                .unwrap();
        }

        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);
        let err = cx.find_folded(EntityKind::Nationality, &key("uk")).unwrap_err();
        match err {
            ResolveError::AmbiguousName { matches, .. } => assert_eq!(matches, vec!["UK", "Uk"]),
            other => panic!("expected AmbiguousName, got {other:?}"),
        }
    }

    #[test]
    fn test_create_searches_first() {
        let (db, change) = open();
        let store = db.store();
        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);

        let first = cx
            .create(NewEntity::reference(EntityKind::Privacy, "Secret"))
            .unwrap();
        let second = cx
            .create(NewEntity::reference(EntityKind::Privacy, "Secret"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.entities(EntityKind::Privacy).unwrap().len(), 1);
    }

    #[test]
    fn test_create_adopts_concurrent_winner() {
        let (db, change) = open();
        let racing = RacingStore {
            inner: db.store(),
            races: Cell::new(1),
            blind: false,
        };
        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&racing, &mut cache, change);

        let adopted = cx
            .create(NewEntity::reference(EntityKind::Privacy, "Secret"))
            .unwrap();

        let stored = db.store().entities(EntityKind::Privacy).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].entity, adopted);
    }

    #[test]
    fn test_second_conflict_escalates() {
        let (db, change) = open();
        let racing = RacingStore {
            inner: db.store(),
            races: Cell::new(1),
            blind: true,
        };
        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&racing, &mut cache, change);

        let err = cx
            .create(NewEntity::reference(EntityKind::Privacy, "Secret"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintViolation { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_race_through_default_resolver() {
        let (db, change) = open();
        let racing = RacingStore {
            inner: db.store(),
            races: Cell::new(1),
            blind: false,
        };
        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&racing, &mut cache, change);
        let mut resolver = DefaultResolver::new(DefaultNames::default());

        let resolved = cx
            .resolve(&mut resolver, &ResolutionRequest::named(EntityKind::SensorType, "GPS"))
            .unwrap();
        assert_eq!(resolved.name, "GPS");
        assert_eq!(db.store().entities(EntityKind::SensorType).unwrap().len(), 1);
    }

    #[test]
    fn test_synonym_rules() {
        let (db, change) = open();
        let store = db.store();
        let uk = store
            .create(&NewEntity::reference(EntityKind::Nationality, "UK"), &change)
            .unwrap();
        let france = store
            .create(&NewEntity::reference(EntityKind::Nationality, "France"), &change)
            .unwrap();

        let mut cache = ResolutionCache::new();
        let mut cx = ResolveContext::new(&store, &mut cache, change);

        // Redundant alias
        assert!(matches!(
            cx.add_synonym(&key("UK"), &uk),
            Err(ResolveError::InvalidSynonym { .. })
        ));
        // Another entity's canonical name
        assert!(matches!(
            cx.add_synonym(&key("France"), &uk),
            Err(ResolveError::InvalidSynonym { .. })
        ));

        cx.add_synonym(&key("Britain"), &uk).unwrap();
        // Same pair again is a no-op
        cx.add_synonym(&key("Britain"), &uk).unwrap();
        // Moving the alias is refused
        assert!(matches!(
            cx.add_synonym(&key("Britain"), &france),
            Err(ResolveError::InvalidSynonym { .. })
        ));

        assert_eq!(cx.lookup(EntityKind::Nationality, &key("Britain")).unwrap(), Some(uk));
        assert_eq!(store.synonyms(None).unwrap().len(), 1);
        assert!(matches!(
            store.get(&france.id).unwrap().unwrap().attributes,
            Attributes::Reference
        ));
    }
}
