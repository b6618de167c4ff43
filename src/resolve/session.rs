//! Import sessions and their transactional units
//!
//! A session owns the resolver and the resolution cache for one run. Each data
//! file is imported in its own unit: a database transaction plus a pending
//! layer in the cache. Both commit together or both are discarded.

use tracing::{debug, warn};

use super::cache::ResolutionCache;
use super::context::ResolveContext;
use super::{ResolutionRequest, ResolveError, Resolver};
use crate::core::audit::{Change, ChangeId};
use crate::core::entity::{Hints, ResolvedEntity};
use crate::core::identity::EntityKind;
use crate::core::name::NameKey;
use crate::core::store::{EntityStore, SqliteStore};

pub struct ImportSession {
    resolver: Box<dyn Resolver>,
    cache: ResolutionCache,
}

impl ImportSession {
    pub fn new(resolver: Box<dyn Resolver>) -> Self {
        Self {
            resolver,
            cache: ResolutionCache::new(),
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Run `f` inside one unit
    ///
    /// The audit change is recorded first so every entity and synonym written
    /// by `f` refers to it. An error from `f` rolls back the transaction and
    /// forgets every cache entry added during the unit.
    pub fn unit<T>(
        &mut self,
        db: &mut SqliteStore,
        change: &Change,
        f: impl FnOnce(&mut UnitScope<'_>) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let unit = db.unit()?;
        let store = unit.store();
        store.record_change(change)?;

        self.cache.begin_unit();
        let result = {
            let mut scope = UnitScope {
                resolver: self.resolver.as_mut(),
                cx: ResolveContext::new(&store, &mut self.cache, change.id),
            };
            f(&mut scope)
        };

        match result {
            Ok(value) => match unit.commit() {
                Ok(()) => {
                    self.cache.commit_unit();
                    debug!(change = %change.id, "unit committed");
                    Ok(value)
                }
                Err(e) => {
                    self.cache.rollback_unit();
                    Err(e.into())
                }
            },
            Err(e) => {
                self.cache.rollback_unit();
                if let Err(rollback) = unit.rollback() {
                    warn!(change = %change.id, error = %rollback, "rollback failed");
                }
                debug!(change = %change.id, error = %e, "unit rolled back");
                Err(e)
            }
        }
    }
}

/// What a file parser sees while its unit is open
pub struct UnitScope<'a> {
    resolver: &'a mut dyn Resolver,
    cx: ResolveContext<'a>,
}

impl UnitScope<'_> {
    /// Resolve a raw name from the file
    pub fn resolve(
        &mut self,
        kind: EntityKind,
        name: Option<&str>,
        hints: &Hints,
    ) -> Result<ResolvedEntity, ResolveError> {
        self.resolve_request(&ResolutionRequest::new(kind, name, hints.clone()))
    }

    pub fn resolve_request(
        &mut self,
        request: &ResolutionRequest,
    ) -> Result<ResolvedEntity, ResolveError> {
        self.cx.resolve(&mut *self.resolver, request)
    }

    /// Record `alias` as a synonym of the entity known as `canonical`
    ///
    /// `canonical` may itself be a synonym; the alias then points at the same
    /// entity.
    pub fn record_synonym(
        &mut self,
        kind: EntityKind,
        alias: &str,
        canonical: &str,
    ) -> Result<ResolvedEntity, ResolveError> {
        let unknown = || ResolveError::UnknownEntity {
            kind,
            name: canonical.to_string(),
        };
        let key = NameKey::new(canonical).ok_or_else(unknown)?;
        let target = self.cx.lookup(kind, &key)?.ok_or_else(unknown)?;

        let alias_key = NameKey::new(alias).ok_or_else(|| ResolveError::InvalidSynonym {
            kind,
            alias: alias.to_string(),
            reason: "it is blank".to_string(),
        })?;
        self.cx.add_synonym(&alias_key, &target)?;
        Ok(target)
    }

    pub fn change(&self) -> ChangeId {
        self.cx.change()
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.cx.store()
    }
}
