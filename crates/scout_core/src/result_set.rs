use std::collections::HashMap;

use crate::{DomainKey, Entity};

/// Deduplicated, append-only set of entities in first-observed order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<Entity>,
    index: HashMap<DomainKey, usize>,
}

/// Outcome of one merge. `added` borrows exactly the entities this merge
/// appended, in the order they were appended.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport<'a> {
    pub added: &'a [Entity],
    /// Candidates whose key was already present (including repeats inside
    /// the same payload).
    pub known: usize,
    /// Candidates dropped because they had no usable domain.
    pub missing_key: usize,
    /// Entries already in the set that a snapshot did not list. Always zero
    /// for incremental merges.
    pub stale: usize,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entity] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<Entity> {
        self.entries
    }

    /// Position of a domain in first-observed order, if present.
    pub fn position(&self, domain: &str) -> Option<usize> {
        let key = crate::normalize_domain(domain)?;
        self.index.get(&key).copied()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.position(domain).is_some()
    }

    pub fn get(&self, domain: &str) -> Option<&Entity> {
        self.position(domain).map(|pos| &self.entries[pos])
    }

    /// Merge a delta batch: unseen keys are appended in arrival order,
    /// everything else is dropped.
    pub fn merge_incremental<I>(&mut self, batch: I) -> MergeReport<'_>
    where
        I: IntoIterator<Item = Entity>,
    {
        let start = self.entries.len();
        let mut known = 0;
        let mut missing_key = 0;

        for entity in batch {
            let Some(key) = entity.key() else {
                missing_key += 1;
                continue;
            };
            if self.index.contains_key(&key) {
                known += 1;
                continue;
            }
            self.insert(key, entity);
        }

        MergeReport {
            added: &self.entries[start..],
            known,
            missing_key,
            stale: 0,
        }
    }

    /// Merge a complete snapshot: keys not yet present are appended in the
    /// snapshot's relative order. Entries already present are never removed,
    /// replaced or moved, even when the snapshot omits or reorders them.
    pub fn merge_snapshot<I>(&mut self, full_list: I) -> MergeReport<'_>
    where
        I: IntoIterator<Item = Entity>,
    {
        let start = self.entries.len();
        let mut listed = vec![false; start];
        let mut known = 0;
        let mut missing_key = 0;

        for entity in full_list {
            let Some(key) = entity.key() else {
                missing_key += 1;
                continue;
            };
            match self.index.get(&key) {
                Some(&pos) => {
                    known += 1;
                    if let Some(seen) = listed.get_mut(pos) {
                        *seen = true;
                    }
                }
                None => self.insert(key, entity),
            }
        }

        let stale = listed.iter().filter(|seen| !**seen).count();
        MergeReport {
            added: &self.entries[start..],
            known,
            missing_key,
            stale,
        }
    }

    fn insert(&mut self, key: DomainKey, entity: Entity) {
        self.index.insert(key, self.entries.len());
        self.entries.push(entity);
    }
}
