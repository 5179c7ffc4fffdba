//! Domain index: which task handles belong to which domain.
//!
//! Lets `process_domain` look only at the tasks of the domain being
//! processed instead of scanning every task in the registry. The index is
//! kept in sync with the registry's task map by the registry itself; it
//! never decides on its own that a task exists.

use std::collections::HashSet;

use dashmap::DashMap;
use tickwork_clock::DomainKey;

use crate::TaskId;

pub(crate) struct DomainIndex<D: DomainKey> {
    domains: DashMap<D, HashSet<TaskId>>,
}

impl<D: DomainKey> DomainIndex<D> {
    pub(crate) fn new() -> Self {
        Self {
            domains: DashMap::new(),
        }
    }

    pub(crate) fn insert(&self, domain: D, id: TaskId) {
        self.domains.entry(domain).or_default().insert(id);
    }

    /// Removes one handle. Drops the domain's set once it is empty so
    /// torn-down domains leave nothing behind.
    pub(crate) fn remove(&self, domain: &D, id: TaskId) -> bool {
        let (removed, emptied) = match self.domains.get_mut(domain) {
            Some(mut ids) => (ids.remove(&id), ids.is_empty()),
            None => return false,
        };
        if emptied {
            self.domains.remove_if(domain, |_, ids| ids.is_empty());
        }
        removed
    }

    /// Removes and returns every handle of `domain`.
    pub(crate) fn take(&self, domain: &D) -> HashSet<TaskId> {
        self.domains
            .remove(domain)
            .map(|(_, ids)| ids)
            .unwrap_or_default()
    }

    /// Copy of the domain's handles, so callers can iterate without
    /// holding a lock while tasks run.
    pub(crate) fn snapshot(&self, domain: &D) -> Vec<TaskId> {
        self.domains
            .get(domain)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, domain: &D) -> usize {
        self.domains.get(domain).map_or(0, |ids| ids.len())
    }

    pub(crate) fn domains(&self) -> Vec<D> {
        self.domains.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_snapshot() {
        let index = DomainIndex::new();
        let a = TaskId::next();
        let b = TaskId::next();
        index.insert("overworld", a);
        index.insert("overworld", b);

        let mut ids = index.snapshot(&"overworld");
        ids.sort_unstable();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(index.count(&"overworld"), 2);
        assert!(index.snapshot(&"nether").is_empty());
    }

    #[test]
    fn test_remove_last_handle_drops_domain() {
        let index = DomainIndex::new();
        let a = TaskId::next();
        index.insert("overworld", a);

        assert!(index.remove(&"overworld", a));
        assert!(!index.remove(&"overworld", a));
        assert!(index.domains().is_empty());
    }

    #[test]
    fn test_take_empties_domain() {
        let index = DomainIndex::new();
        index.insert("overworld", TaskId::next());
        index.insert("overworld", TaskId::next());
        index.insert("nether", TaskId::next());

        assert_eq!(index.take(&"overworld").len(), 2);
        assert_eq!(index.count(&"overworld"), 0);
        assert_eq!(index.count(&"nether"), 1);
        assert!(index.take(&"overworld").is_empty());
    }
}
