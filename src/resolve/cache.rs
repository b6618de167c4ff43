//! Session-scoped resolution cache
//!
//! Maps `(kind, name key)` to the entity a name resolved to, so the same name
//! costs at most one store round trip or operator prompt per session. Entries
//! written inside an import unit stay pending until the unit commits; a
//! rolled-back unit takes its entries with it.

use std::collections::HashMap;

use crate::core::entity::ResolvedEntity;
use crate::core::identity::EntityKind;
use crate::core::name::NameKey;

type CacheKey = (EntityKind, NameKey);

/// Hit/miss counters for the session summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    committed: HashMap<CacheKey, ResolvedEntity>,
    pending: HashMap<CacheKey, ResolvedEntity>,
    in_unit: bool,
    hits: usize,
    misses: usize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a name up, counting the hit or miss
    pub fn lookup(&mut self, kind: EntityKind, name: &NameKey) -> Option<ResolvedEntity> {
        let key = (kind, name.clone());
        let found = self
            .pending
            .get(&key)
            .or_else(|| self.committed.get(&key))
            .cloned();
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    /// Remember a resolution; an existing entry for the same key is never replaced
    pub fn store(&mut self, kind: EntityKind, name: NameKey, entity: ResolvedEntity) {
        let key = (kind, name);
        if self.committed.contains_key(&key) {
            return;
        }
        let target = if self.in_unit {
            &mut self.pending
        } else {
            &mut self.committed
        };
        target.entry(key).or_insert(entity);
    }

    /// Start collecting entries for an import unit
    pub fn begin_unit(&mut self) {
        self.pending.clear();
        self.in_unit = true;
    }

    /// Keep the unit's entries for the rest of the session
    pub fn commit_unit(&mut self) {
        for (key, entity) in self.pending.drain() {
            self.committed.entry(key).or_insert(entity);
        }
        self.in_unit = false;
    }

    /// Forget everything the unit resolved
    pub fn rollback_unit(&mut self) {
        self.pending.clear();
        self.in_unit = false;
    }

    pub fn len(&self) -> usize {
        self.committed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}
