//! `defillamaId` to display-name index used for fuzzy joins
//!
//! Datasets that carry a name instead of an id (NFT marketplaces, the
//! emissions list) are matched by slug against this index. Entries keep the
//! order they were first inserted in, which is the order of the protocols
//! listing; when two names share a slug the earliest entry wins.

use std::collections::{HashMap, HashSet};

use crate::slug::slug;

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name for an id. Re-inserting an id replaces the name but
    /// keeps the id's original position.
    pub fn insert(&mut self, id: &str, name: &str) {
        match self.positions.get(id) {
            Some(&pos) => self.entries[pos].1 = name.to_string(),
            None => {
                self.positions.insert(id.to_string(), self.entries.len());
                self.entries.push((id.to_string(), name.to_string()));
            }
        }
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.positions
            .get(id)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// First id (in insertion order) whose name slugifies to `target`.
    ///
    /// Insertion order is listing order, not the numeric-ids-first order a
    /// JavaScript object walk would give.
    pub fn find_by_slug(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, name)| slug(name) == target)
            .map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct slugs claimed by more than one id.
    pub fn slug_collisions(&self) -> usize {
        let mut seen = HashSet::new();
        let mut duplicated = HashSet::new();
        for (_, name) in &self.entries {
            let s = slug(name);
            if !seen.insert(s.clone()) {
                duplicated.insert(s);
            }
        }
        duplicated.len()
    }
}
