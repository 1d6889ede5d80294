use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::neighbors::NeighborEntry;

/// The neighbor cache of one interface.
///
/// The table lock only protects the mapping; entries have their own lock.
/// Readers get shared references, so an entry removed while in use stays
/// alive until its last user drops it, marked as detached.
#[derive(Debug, Default)]
pub struct NeighborCache {
    entries: RwLock<HashMap<Ipv6Addr, Arc<NeighborEntry>>>,
}

impl NeighborCache {
    pub fn lookup(&self, addr: Ipv6Addr) -> Option<Arc<NeighborEntry>> {
        self.entries
            .read()
            .unwrap()
            .get(&addr)
            .filter(|entry| !entry.is_detached())
            .cloned()
    }

    /// Return the entry for `addr`, creating an INCOMPLETE one if there is none.
    /// The boolean is true when the entry was created.
    pub(crate) fn get_or_insert(
        &self,
        addr: Ipv6Addr,
        ifindex: u32,
        now: Duration,
    ) -> (Arc<NeighborEntry>, bool) {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get(&addr) {
            if !entry.is_detached() {
                return (entry.clone(), false);
            }
        }
        let entry = Arc::new(NeighborEntry::new(addr, ifindex, now));
        entries.insert(addr, entry.clone());
        (entry, true)
    }

    /// Remove `entry` from the table, if it is still the entry stored for its address.
    pub(crate) fn remove(&self, entry: &Arc<NeighborEntry>) -> bool {
        let mut entries = self.entries.write().unwrap();
        match entries.get(&entry.addr()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(&entry.addr());
                true
            }
            _ => false,
        }
    }

    /// Number of entries, including those being deleted.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// References to every live entry, taken under a short read lock.
    pub fn snapshot(&self) -> Vec<Arc<NeighborEntry>> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| !entry.is_detached())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::neighbors::NeighborCache;

    #[test]
    fn test_single_entry_per_address() {
        let cache = NeighborCache::default();
        let addr: Ipv6Addr = "fe80::1".parse().unwrap();
        let (first, created) = cache.get_or_insert(addr, 1, Duration::ZERO);
        assert!(created);
        let (second, created) = cache.get_or_insert(addr, 1, Duration::ZERO);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_detached_entry_is_replaced() {
        let cache = NeighborCache::default();
        let addr: Ipv6Addr = "fe80::1".parse().unwrap();
        let (old, _) = cache.get_or_insert(addr, 1, Duration::ZERO);
        {
            let mut inner = old.write();
            old.detach(&mut inner);
        }
        assert!(cache.lookup(addr).is_none());
        assert!(cache.snapshot().is_empty());

        let (new, created) = cache.get_or_insert(addr, 1, Duration::ZERO);
        assert!(created);
        assert!(!cache.remove(&old));
        assert!(cache.remove(&new));
        assert!(cache.is_empty());
    }
}
