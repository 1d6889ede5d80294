//! Address-family independent part of address resolution and NUD.
//!
//! This module owns the hold queue discipline and the timer-driven half of
//! the state machine (RFC 4861 section 7.3.3):
//!
//! - INCOMPLETE: multicast solicitations every retransmission interval, deleted once exhausted.
//! - REACHABLE: becomes STALE when the reachable time expires.
//! - STALE: deleted when unused for the GC time; becomes DELAY when used.
//! - DELAY: becomes PROBE, unless NUD is disabled on the interface.
//! - PROBE: unicast solicitations every retransmission interval, deleted once exhausted.
//!
//! Everything that must happen without the entry lock (transmission,
//! table removal, notifications) is returned as a [`Followup`].
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use log::trace;

use crate::error::ResolveError;
use crate::interface::Interface;
use crate::models::{HeldPacket, LinkAddr, NudState};
use crate::neighbors::{EntryInner, NeighborEntry};
use crate::timer::TimerId;

/// Per-address-family parameters and services used by the resolver.
pub trait NdDomain {
    /// Current time on the context clock.
    fn now(&self) -> Duration;
    /// Maximum number of packets held by an INCOMPLETE entry.
    fn max_queue_len(&self) -> usize;
    fn delay_first_probe(&self) -> Duration;
    /// Number of multicast solicitations before giving up on an INCOMPLETE entry.
    fn mcast_solicit(&self, ifp: &Interface) -> u32;
    /// Number of unicast solicitations before giving up on a PROBE entry.
    fn ucast_solicit(&self, ifp: &Interface) -> u32;
    fn reachable_time(&self, ifp: &Interface) -> Duration;
    fn retrans_timer(&self, ifp: &Interface) -> Duration;
    /// Lifetime of an unused STALE entry.
    fn gc_timer(&self) -> Duration;
    fn nud_enabled(&self, ifp: &Interface) -> bool;
    /// Schedule the expiry of `entry` in `after`, tagged with `generation`.
    fn set_timer(&self, entry: &Arc<NeighborEntry>, generation: u64, after: Duration) -> TimerId;
    /// Remove a timer that has not expired yet.
    fn cancel_timer(&self, timer: TimerId);
}

/// The entry timers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NdTimer {
    Reachable,
    Retrans,
    Delay,
    Gc,
}

/// Work to do once the entry lock is released.
#[derive(Debug, PartialEq, Eq)]
pub enum Followup {
    /// Send a Neighbor Solicitation for the entry's address.
    /// `unicast` holds the link-layer destination of a NUD probe.
    Solicit {
        target: Ipv6Addr,
        unicast: Option<LinkAddr>,
        source_hint: Option<Ipv6Addr>,
    },
    /// Transmit packets that were waiting for resolution, in order.
    Release {
        lladdr: LinkAddr,
        packets: Vec<HeldPacket>,
    },
    /// The entry was detached and must be removed from its cache.
    Delete {
        packets: Vec<HeldPacket>,
        router: bool,
    },
    /// The neighbor stopped being a router.
    RouterFlagCleared,
}

/// Outcome of a resolution request.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The packet can be sent to this link-layer address now.
    Resolved(LinkAddr, HeldPacket),
    /// The packet was queued on the entry until resolution completes.
    Pending,
}

/// Arm one of the entry timers, replacing any pending one.
pub fn set_timer<D: NdDomain>(
    domain: &D,
    ifp: &Interface,
    entry: &Arc<NeighborEntry>,
    inner: &mut EntryInner,
    timer: NdTimer,
) {
    let after = match timer {
        NdTimer::Reachable => domain.reachable_time(ifp),
        NdTimer::Retrans => domain.retrans_timer(ifp),
        NdTimer::Delay => domain.delay_first_probe(),
        NdTimer::Gc => domain.gc_timer(),
    };
    stop_timer(domain, inner);
    inner.expire = Some(domain.now() + after);
    inner.timer = Some(domain.set_timer(entry, inner.timer_generation, after));
}

/// Cancel the pending timer of an entry.
pub fn stop_timer<D: NdDomain>(domain: &D, inner: &mut EntryInner) {
    if let Some(timer) = inner.cancel_timer() {
        domain.cancel_timer(timer);
    }
}

/// Resolve through an entry, with its lock held.
///
/// A usable entry returns its link-layer address (STALE entries move to DELAY).
/// An INCOMPLETE entry takes ownership of the packet; the first packet
/// starts the solicitations. A full hold queue drops the packet.
pub fn resolve<D: NdDomain>(
    domain: &D,
    ifp: &Interface,
    entry: &Arc<NeighborEntry>,
    inner: &mut EntryInner,
    packet: HeldPacket,
    followups: &mut Vec<Followup>,
) -> Result<Resolution, ResolveError> {
    if inner.state.is_usable() {
        if let Some(lladdr) = inner.lladdr {
            if inner.state == NudState::Stale {
                inner.asked = 0;
                inner.set_state(NudState::Delay, domain.now());
                set_timer(domain, ifp, entry, inner, NdTimer::Delay);
                trace!("{}: {} STALE -> DELAY", ifp.name(), entry.addr());
            }
            return Ok(Resolution::Resolved(lladdr, packet));
        }
    }

    if inner.hold.len() >= domain.max_queue_len() {
        return Err(ResolveError::NoBuffers);
    }
    inner.hold.push_back(packet);

    if inner.asked == 0 {
        inner.asked = 1;
        set_timer(domain, ifp, entry, inner, NdTimer::Retrans);
        followups.push(Followup::Solicit {
            target: entry.addr(),
            unicast: None,
            source_hint: first_source(inner),
        });
    }
    Ok(Resolution::Pending)
}

/// Handle the expiry of an entry timer, with its lock held.
pub fn expire<D: NdDomain>(
    domain: &D,
    ifp: &Interface,
    entry: &Arc<NeighborEntry>,
    inner: &mut EntryInner,
    followups: &mut Vec<Followup>,
) {
    if inner.permanent {
        return;
    }
    let now = domain.now();
    match inner.state {
        NudState::Incomplete => {
            if inner.asked < domain.mcast_solicit(ifp) {
                inner.asked += 1;
                set_timer(domain, ifp, entry, inner, NdTimer::Retrans);
                followups.push(Followup::Solicit {
                    target: entry.addr(),
                    unicast: None,
                    source_hint: first_source(inner),
                });
            } else {
                delete(domain, entry, inner, followups);
            }
        }
        NudState::Reachable => {
            inner.set_state(NudState::Stale, now);
            set_timer(domain, ifp, entry, inner, NdTimer::Gc);
        }
        NudState::Stale => delete(domain, entry, inner, followups),
        NudState::Delay => {
            if domain.nud_enabled(ifp) {
                inner.asked = 1;
                inner.set_state(NudState::Probe, now);
                set_timer(domain, ifp, entry, inner, NdTimer::Retrans);
                followups.push(Followup::Solicit {
                    target: entry.addr(),
                    unicast: inner.lladdr,
                    source_hint: None,
                });
            } else {
                inner.set_state(NudState::Stale, now);
                set_timer(domain, ifp, entry, inner, NdTimer::Gc);
            }
        }
        NudState::Probe => {
            if inner.asked < domain.ucast_solicit(ifp) {
                inner.asked += 1;
                set_timer(domain, ifp, entry, inner, NdTimer::Retrans);
                followups.push(Followup::Solicit {
                    target: entry.addr(),
                    unicast: inner.lladdr,
                    source_hint: None,
                });
            } else {
                delete(domain, entry, inner, followups);
            }
        }
    }
    trace!(
        "{}: {} timer expired, now {} asked={}",
        ifp.name(),
        entry.addr(),
        inner.state,
        inner.asked
    );
}

fn delete<D: NdDomain>(
    domain: &D,
    entry: &Arc<NeighborEntry>,
    inner: &mut EntryInner,
    followups: &mut Vec<Followup>,
) {
    stop_timer(domain, inner);
    let router = inner.is_router;
    let packets = entry.detach(inner);
    followups.push(Followup::Delete { packets, router });
}

fn first_source(inner: &EntryInner) -> Option<Ipv6Addr> {
    inner.hold.front().and_then(|packet| packet.source())
}
