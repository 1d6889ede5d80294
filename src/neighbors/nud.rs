//! Neighbor cache updates from protocol input, and the output path.
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use ip_network::Ipv6Network;
use log::{debug, trace, warn};

use crate::context::NdContext;
use crate::error::ResolveError;
use crate::interface::Interface;
use crate::models::{HeldPacket, InputKind, LinkAddr, NudState};
use crate::neighbors::resolver::{
    self, set_timer, stop_timer, Followup, NdDomain, NdTimer, Resolution,
};
use crate::neighbors::{EntryInner, NeighborEntry, NeighborInfo};
use crate::timer::TimerId;
use crate::utilities::{is_link_local, multicast_lladdr};

/// Apply a protocol event to an entry, with its lock held.
///
/// `created` is set when the entry was just created for this event, in which
/// case a link-layer address is always supplied.
#[allow(clippy::too_many_arguments)]
pub(crate) fn update<D: NdDomain>(
    domain: &D,
    ifp: &Interface,
    entry: &Arc<NeighborEntry>,
    inner: &mut EntryInner,
    lladdr: Option<LinkAddr>,
    kind: InputKind,
    created: bool,
    followups: &mut Vec<Followup>,
) {
    if inner.permanent {
        return;
    }
    let now = domain.now();
    let old = inner.lladdr;
    let was_router = inner.is_router;

    if created {
        inner.lladdr = lladdr;
        inner.set_state(NudState::Stale, now);
        set_timer(domain, ifp, entry, inner, NdTimer::Gc);
    } else {
        if inner.state == NudState::Incomplete && lladdr.is_none() {
            return;
        }
        let llchange = matches!((lladdr, old), (Some(new), Some(old)) if new != old);
        if llchange && !kind.is_override() {
            // Do not trust a non-authoritative advertisement, only lower our confidence.
            if inner.state == NudState::Reachable {
                inner.set_state(NudState::Stale, now);
                set_timer(domain, ifp, entry, inner, NdTimer::Gc);
            }
            return;
        }
        let changed = lladdr.is_some() && lladdr != old;
        if changed {
            inner.lladdr = lladdr;
        }
        if kind.is_solicited() {
            inner.asked = 0;
            inner.set_state(NudState::Reachable, now);
            set_timer(domain, ifp, entry, inner, NdTimer::Reachable);
        } else if changed {
            inner.set_state(NudState::Stale, now);
            set_timer(domain, ifp, entry, inner, NdTimer::Gc);
        }
    }

    match kind {
        InputKind::NeighborSolicit => {
            if created {
                inner.is_router = false;
            }
        }
        InputKind::NeighborAdvert(flags) => inner.is_router = flags.router,
        InputKind::RouterSolicit => inner.is_router = false,
        InputKind::RouterAdvert => {
            if (!created && (old.is_some() || lladdr.is_some())) || (created && lladdr.is_some()) {
                inner.is_router = true;
            }
        }
        InputKind::Redirect { router } => {
            if router {
                inner.is_router = true;
            } else if created {
                inner.is_router = false;
            }
        }
    }
    if was_router && !inner.is_router {
        followups.push(Followup::RouterFlagCleared);
    }

    if !inner.hold.is_empty() {
        if let (true, Some(lladdr)) = (inner.state.is_usable(), inner.lladdr) {
            // Sending to a STALE neighbor starts the DELAY timer.
            if inner.state == NudState::Stale {
                inner.set_state(NudState::Delay, now);
                set_timer(domain, ifp, entry, inner, NdTimer::Delay);
            }
            followups.push(Followup::Release {
                lladdr,
                packets: inner.hold.drain(..).collect(),
            });
        }
    }
}

impl NdDomain for NdContext {
    fn now(&self) -> Duration {
        NdContext::now(self)
    }

    fn max_queue_len(&self) -> usize {
        self.config().max_queue_len
    }

    fn delay_first_probe(&self) -> Duration {
        self.config().delay_first_probe
    }

    fn mcast_solicit(&self, _ifp: &Interface) -> u32 {
        self.config().mcast_solicit
    }

    fn ucast_solicit(&self, _ifp: &Interface) -> u32 {
        self.config().ucast_solicit
    }

    fn reachable_time(&self, ifp: &Interface) -> Duration {
        ifp.reachable_time()
    }

    fn retrans_timer(&self, ifp: &Interface) -> Duration {
        ifp.settings().retrans_timer
    }

    fn gc_timer(&self) -> Duration {
        self.config().gc_timer
    }

    fn nud_enabled(&self, ifp: &Interface) -> bool {
        ifp.settings().nud_enabled
    }

    fn set_timer(&self, entry: &Arc<NeighborEntry>, generation: u64, after: Duration) -> TimerId {
        self.schedule_neighbor_timer(entry, generation, after)
    }

    fn cancel_timer(&self, timer: TimerId) {
        NdContext::cancel_timer(self, timer);
    }
}

impl NdContext {
    /// Update the neighbor cache from a protocol event naming `from`.
    ///
    /// This is the only place where input modifies cache entries:
    /// Neighbor Solicitations and Advertisements are routed here by the
    /// protocol handlers, and the router discovery and redirect handlers
    /// call it directly.
    pub fn on_input(
        &self,
        ifp: &Interface,
        from: Ipv6Addr,
        lladdr: Option<LinkAddr>,
        kind: InputKind,
    ) {
        if !ifp.link_type().needs_cache() || from.is_unspecified() || from.is_multicast() {
            return;
        }
        let (entry, created) = match ifp.cache().lookup(from) {
            Some(entry) => (entry, false),
            None => {
                if lladdr.is_none() {
                    return;
                }
                match self.create_entry(ifp, from) {
                    Ok(created) => created,
                    Err(error) => {
                        debug!("{}: cannot create entry for {}: {}", ifp.name(), from, error);
                        return;
                    }
                }
            }
        };

        let mut followups = vec![];
        {
            let mut inner = entry.write();
            if entry.is_detached() {
                return;
            }
            let before = inner.state;
            update(
                self,
                ifp,
                &entry,
                &mut inner,
                lladdr,
                kind,
                created,
                &mut followups,
            );
            if before != inner.state || created {
                debug!(
                    "{}: neighbor {} {} -> {} lladdr={:?}",
                    ifp.name(),
                    from,
                    if created { "(new)".to_string() } else { before.to_string() },
                    inner.state,
                    inner.lladdr
                );
            }
        }
        self.run_followups(ifp, &entry, followups);
    }

    /// Resolve the link-layer address of `next_hop` for an outbound packet.
    ///
    /// On [`Resolution::Pending`] the packet is now owned by the hold queue of
    /// the entry and is transmitted or dropped exactly once. On error it is dropped.
    pub fn resolve(
        &self,
        ifp: &Interface,
        next_hop: Ipv6Addr,
        packet: HeldPacket,
    ) -> Result<Resolution, ResolveError> {
        if ifp.is_disabled() {
            return Err(ResolveError::NetDown);
        }
        if next_hop.is_multicast() || !ifp.link_type().needs_cache() {
            return Ok(Resolution::Resolved(
                self.link_destination(ifp, next_hop),
                packet,
            ));
        }

        // Fast path: no exclusive lock for reachable neighbors.
        if let Some(entry) = ifp.cache().lookup(next_hop) {
            let inner = entry.read();
            if inner.state == NudState::Reachable {
                if let Some(lladdr) = inner.lladdr {
                    return Ok(Resolution::Resolved(lladdr, packet));
                }
            }
        }

        let mut followups = vec![];
        let mut attempts = 0;
        let (entry, result) = loop {
            attempts += 1;
            let entry = match ifp.cache().lookup(next_hop) {
                Some(entry) => entry,
                None => {
                    if !self.is_neighbor(ifp, next_hop) {
                        trace!("{}: {} is not a neighbor", ifp.name(), next_hop);
                        return Err(ResolveError::NetDown);
                    }
                    self.create_entry(ifp, next_hop)?.0
                }
            };
            let mut inner = entry.write();
            if entry.is_detached() {
                // Deleted between the lookup and the lock.
                if attempts < 3 {
                    continue;
                }
                return Err(ResolveError::NoBuffers);
            }
            let result = resolver::resolve(self, ifp, &entry, &mut inner, packet, &mut followups);
            drop(inner);
            break (entry, result);
        };

        if matches!(result, Err(ResolveError::NoBuffers)) {
            self.statistics().lock().unwrap().hold_drops += 1;
            debug!("{}: hold queue of {} is full", ifp.name(), next_hop);
        }
        self.run_followups(ifp, &entry, followups);
        result
    }

    /// Resolve and transmit an IPv6 packet to an on-link next-hop.
    pub fn output(
        &self,
        ifp: &Interface,
        next_hop: Ipv6Addr,
        packet: Vec<u8>,
    ) -> Result<(), ResolveError> {
        match self.resolve(ifp, next_hop, HeldPacket::new(packet))? {
            Resolution::Resolved(lladdr, packet) => self.transmit(ifp, lladdr, packet.as_bytes()),
            Resolution::Pending => {}
        }
        Ok(())
    }

    /// Whether `addr` is on the link of `ifp`.
    pub fn is_neighbor(&self, ifp: &Interface, addr: Ipv6Addr) -> bool {
        is_link_local(addr) || ifp.onlink().contains(addr) || ifp.cache().lookup(addr).is_some()
    }

    /// Install a permanent entry, which input never modifies and GC never collects.
    pub fn add_static_neighbor(
        &self,
        ifp: &Interface,
        addr: Ipv6Addr,
        lladdr: LinkAddr,
    ) -> Result<()> {
        if lladdr.len() != ifp.addr_len() {
            bail!(
                "{}: link-layer address {} has {} bytes, expected {}",
                ifp.name(),
                lladdr,
                lladdr.len(),
                ifp.addr_len()
            );
        }
        if addr.is_multicast() || addr.is_unspecified() {
            bail!("{}: invalid neighbor address {}", ifp.name(), addr);
        }
        let (entry, _) = self.create_entry(ifp, addr)?;
        let mut followups = vec![];
        {
            let mut inner = entry.write();
            stop_timer(self, &mut inner);
            inner.permanent = true;
            inner.asked = 0;
            inner.lladdr = Some(lladdr);
            inner.set_state(NudState::Reachable, self.now());
            if !inner.hold.is_empty() {
                followups.push(Followup::Release {
                    lladdr,
                    packets: inner.hold.drain(..).collect(),
                });
            }
        }
        debug!("{}: static neighbor {} at {}", ifp.name(), addr, lladdr);
        self.run_followups(ifp, &entry, followups);
        Ok(())
    }

    /// Delete the entry of `addr`, returning whether there was one.
    pub fn remove_neighbor(&self, ifp: &Interface, addr: Ipv6Addr) -> bool {
        match ifp.cache().lookup(addr) {
            Some(entry) => self.delete_entry(ifp, &entry),
            None => false,
        }
    }

    /// Delete every non-static entry inside `network`, returning how many were deleted.
    pub fn purge_prefix(&self, ifp: &Interface, network: Ipv6Network) -> usize {
        let purged = ifp
            .cache()
            .snapshot()
            .into_iter()
            .filter(|entry| network.contains(entry.addr()) && !entry.read().permanent)
            .filter(|entry| self.delete_entry(ifp, entry))
            .count();
        if purged > 0 {
            debug!("{}: purged {} neighbors in {}", ifp.name(), purged, network);
        }
        purged
    }

    pub fn neighbor(&self, ifp: &Interface, addr: Ipv6Addr) -> Option<NeighborInfo> {
        ifp.cache().lookup(addr).map(|entry| entry.info())
    }

    /// Snapshots of every entry of an interface, ordered by address.
    pub fn neighbors(&self, ifp: &Interface) -> Vec<NeighborInfo> {
        let mut neighbors: Vec<NeighborInfo> = ifp
            .cache()
            .snapshot()
            .iter()
            .map(|entry| entry.info())
            .collect();
        neighbors.sort_by_key(|info| info.addr);
        neighbors
    }

    /// Find or create the entry of `addr`, collecting garbage when the cache is full.
    pub(crate) fn create_entry(
        &self,
        ifp: &Interface,
        addr: Ipv6Addr,
    ) -> Result<(Arc<NeighborEntry>, bool), ResolveError> {
        let cache = ifp.cache();
        if let Some(entry) = cache.lookup(addr) {
            return Ok((entry, false));
        }
        if cache.len() >= self.config().cache_limit {
            self.gc(ifp, None);
            if cache.len() >= self.config().cache_limit {
                warn!("{}: neighbor cache is full", ifp.name());
                return Err(ResolveError::NoBuffers);
            }
        }
        let (entry, created) = cache.get_or_insert(addr, ifp.index(), self.now());
        if created && cache.len() > self.config().gc_threshold {
            self.gc(ifp, Some(&entry));
        }
        Ok((entry, created))
    }

    /// Detach and remove an entry. Returns false if it was already deleted.
    pub(crate) fn delete_entry(&self, ifp: &Interface, entry: &Arc<NeighborEntry>) -> bool {
        let (packets, router) = {
            let mut inner = entry.write();
            if entry.is_detached() {
                return false;
            }
            stop_timer(self, &mut inner);
            let router = inner.is_router;
            (entry.detach(&mut inner), router)
        };
        self.run_followups(ifp, entry, vec![Followup::Delete { packets, router }]);
        true
    }

    pub(crate) fn neighbor_timer(&self, entry: &Arc<NeighborEntry>, generation: u64) {
        let Some(ifp) = self.interface(entry.ifindex()) else {
            return;
        };
        let mut followups = vec![];
        {
            let mut inner = entry.write();
            if entry.is_detached() || inner.timer_generation != generation {
                return;
            }
            inner.expire = None;
            inner.timer = None;
            resolver::expire(self, &ifp, entry, &mut inner, &mut followups);
        }
        self.run_followups(&ifp, entry, followups);
    }

    /// Carry out the work collected under an entry lock.
    pub(crate) fn run_followups(
        &self,
        ifp: &Interface,
        entry: &Arc<NeighborEntry>,
        followups: Vec<Followup>,
    ) {
        for followup in followups {
            match followup {
                Followup::Solicit {
                    target,
                    unicast,
                    source_hint,
                } => self.ns_output(ifp, target, unicast, source_hint),
                Followup::Release { lladdr, packets } => {
                    trace!(
                        "{}: releasing {} packets to {}",
                        ifp.name(),
                        packets.len(),
                        entry.addr()
                    );
                    for packet in packets {
                        self.transmit(ifp, lladdr, packet.as_bytes());
                    }
                }
                Followup::Delete { packets, router } => {
                    ifp.cache().remove(entry);
                    debug!("{}: neighbor {} deleted", ifp.name(), entry.addr());
                    if !packets.is_empty() {
                        self.statistics().lock().unwrap().unresolved += packets.len() as u64;
                        self.hooks().output.unresolved(ifp, entry.addr(), packets);
                    }
                    if router {
                        self.hooks().routers.on_router_removed(entry.addr(), ifp);
                    }
                }
                Followup::RouterFlagCleared => {
                    debug!("{}: {} is no longer a router", ifp.name(), entry.addr());
                    self.hooks()
                        .routers
                        .on_router_flag_cleared(entry.addr(), ifp);
                    if !self.config().forwarding {
                        self.hooks().routers.flush_routes(entry.addr(), ifp);
                    }
                }
            }
        }
    }

    /// The link-layer destination of a multicast group, or of any address on links
    /// without link-layer addressing.
    pub(crate) fn link_destination(&self, ifp: &Interface, dst: Ipv6Addr) -> LinkAddr {
        if ifp.link_type().needs_cache() && dst.is_multicast() {
            multicast_lladdr(dst)
        } else {
            LinkAddr::EMPTY
        }
    }
}
