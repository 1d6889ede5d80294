//! Reclaim idle neighbor cache entries.
use std::sync::Arc;

use log::debug;

use crate::context::NdContext;
use crate::interface::Interface;
use crate::models::NudState;
use crate::neighbors::resolver::{stop_timer, Followup};
use crate::neighbors::NeighborEntry;

/// Pick at most `batch` GC victims, least recently updated first.
///
/// Only STALE and INCOMPLETE entries that are not static are eligible.
/// Entries whose lock is currently held are skipped, as is `exclude`
/// (the entry whose creation triggered the collection).
pub fn select_victims(
    entries: &[Arc<NeighborEntry>],
    exclude: Option<&Arc<NeighborEntry>>,
    batch: usize,
) -> Vec<Arc<NeighborEntry>> {
    let mut candidates: Vec<_> = entries
        .iter()
        .filter(|entry| exclude.map_or(true, |excluded| !Arc::ptr_eq(entry, excluded)))
        .filter_map(|entry| {
            let inner = entry.try_read().ok()?;
            let eligible = !inner.permanent
                && matches!(inner.state, NudState::Stale | NudState::Incomplete);
            eligible.then(|| (inner.updated, entry.clone()))
        })
        .collect();
    candidates.sort_by_key(|(updated, _)| *updated);
    candidates
        .into_iter()
        .take(batch)
        .map(|(_, entry)| entry)
        .collect()
}

impl NdContext {
    /// Evict a batch of idle entries from the cache of `ifp`, returning how many were evicted.
    pub(crate) fn gc(&self, ifp: &Interface, exclude: Option<&Arc<NeighborEntry>>) -> usize {
        let victims = select_victims(
            &ifp.cache().snapshot(),
            exclude,
            self.config().gc_batch,
        );
        let mut evicted = 0;
        for victim in victims {
            let (packets, router) = {
                // Never wait for a writer.
                let Ok(mut inner) = victim.try_write() else {
                    continue;
                };
                let eligible = !inner.permanent
                    && matches!(inner.state, NudState::Stale | NudState::Incomplete);
                if victim.is_detached() || !eligible {
                    continue;
                }
                stop_timer(self, &mut inner);
                let router = inner.is_router;
                (victim.detach(&mut inner), router)
            };
            self.run_followups(ifp, &victim, vec![Followup::Delete { packets, router }]);
            evicted += 1;
        }
        if evicted > 0 {
            debug!(
                "{}: gc evicted {} entries ({} left)",
                ifp.name(),
                evicted,
                ifp.cache().len()
            );
            self.statistics().lock().unwrap().gc_evictions += evicted as u64;
        }
        evicted
    }

    /// Collect garbage on every interface whose cache is above the GC threshold.
    pub fn sweep(&self) {
        for ifp in self.interfaces() {
            if ifp.cache().len() > self.config().gc_threshold {
                self.gc(&ifp, None);
            }
        }
    }
}
