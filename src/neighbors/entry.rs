use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockResult};
use std::time::Duration;

use crate::models::{HeldPacket, LinkAddr, NudState};
use crate::timer::TimerId;

/// A neighbor cache entry.
///
/// The mutable part lives behind a per-entry lock; the address and the
/// interface never change. An entry removed from its cache is marked
/// detached and must not be used anymore, even by holders of a reference.
#[derive(Debug)]
pub struct NeighborEntry {
    addr: Ipv6Addr,
    ifindex: u32,
    inner: RwLock<EntryInner>,
    detached: AtomicBool,
}

#[derive(Debug)]
pub struct EntryInner {
    /// Only set when the state is not INCOMPLETE.
    pub(crate) lladdr: Option<LinkAddr>,
    pub(crate) state: NudState,
    pub(crate) is_router: bool,
    /// Number of solicitations sent in the current state.
    pub(crate) asked: u32,
    /// Static entries are never modified by input, nor expired.
    pub(crate) permanent: bool,
    pub(crate) hold: VecDeque<HeldPacket>,
    pub(crate) expire: Option<Duration>,
    /// The queued timer, if any.
    pub(crate) timer: Option<TimerId>,
    pub(crate) timer_generation: u64,
    /// Time of the last state change, used to pick GC victims.
    pub(crate) updated: Duration,
}

impl EntryInner {
    pub fn lladdr(&self) -> Option<LinkAddr> {
        self.lladdr
    }

    pub fn state(&self) -> NudState {
        self.state
    }

    pub fn is_router(&self) -> bool {
        self.is_router
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn held(&self) -> usize {
        self.hold.len()
    }

    /// Whether the entry holds a link-layer address that can be used for transmission.
    pub fn is_valid(&self) -> bool {
        self.state.is_usable() && self.lladdr.is_some()
    }

    pub(crate) fn set_state(&mut self, state: NudState, now: Duration) {
        self.state = state;
        self.updated = now;
        if state == NudState::Incomplete {
            self.lladdr = None;
        }
    }

    /// Invalidate any pending timer of this entry, returning the queued
    /// timer so that the caller can remove it from the timer queue.
    pub(crate) fn cancel_timer(&mut self) -> Option<TimerId> {
        self.timer_generation += 1;
        self.expire = None;
        self.timer.take()
    }
}

impl NeighborEntry {
    pub(crate) fn new(addr: Ipv6Addr, ifindex: u32, now: Duration) -> Self {
        NeighborEntry {
            addr,
            ifindex,
            inner: RwLock::new(EntryInner {
                lladdr: None,
                state: NudState::Incomplete,
                is_router: false,
                asked: 0,
                permanent: false,
                hold: VecDeque::new(),
                expire: None,
                timer: None,
                timer_generation: 0,
                updated: now,
            }),
            detached: AtomicBool::new(false),
        }
    }

    pub fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EntryInner> {
        self.inner.read().unwrap()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntryInner> {
        self.inner.write().unwrap()
    }

    pub(crate) fn try_read(&self) -> TryLockResult<RwLockReadGuard<'_, EntryInner>> {
        self.inner.try_read()
    }

    pub(crate) fn try_write(&self) -> TryLockResult<RwLockWriteGuard<'_, EntryInner>> {
        self.inner.try_write()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Mark the entry as deleted, returning the packets it was holding.
    ///
    /// Must be called with the entry lock held, before removing it from its
    /// cache. The queued timer is left in `inner.timer` for the caller to cancel.
    pub(crate) fn detach(&self, inner: &mut EntryInner) -> Vec<HeldPacket> {
        self.detached.store(true, Ordering::Release);
        inner.timer_generation += 1;
        inner.expire = None;
        inner.hold.drain(..).collect()
    }

    /// A copy of the entry state.
    pub fn info(&self) -> NeighborInfo {
        let inner = self.read();
        NeighborInfo {
            addr: self.addr,
            ifindex: self.ifindex,
            lladdr: inner.lladdr,
            state: inner.state,
            is_router: inner.is_router,
            permanent: inner.permanent,
            asked: inner.asked,
            held: inner.hold.len(),
            expire: inner.expire,
        }
    }
}

/// A snapshot of a neighbor cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborInfo {
    pub addr: Ipv6Addr,
    pub ifindex: u32,
    pub lladdr: Option<LinkAddr>,
    pub state: NudState,
    pub is_router: bool,
    pub permanent: bool,
    pub asked: u32,
    /// Number of packets waiting for resolution.
    pub held: usize,
    /// Deadline of the entry timer on the context clock.
    pub expire: Option<Duration>,
}

impl Display for NeighborInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "addr={} ifindex={}", self.addr, self.ifindex)?;
        match self.lladdr {
            Some(lladdr) => write!(f, " lladdr={}", lladdr)?,
            None => write!(f, " lladdr=(incomplete)")?,
        }
        write!(f, " state={}", self.state)?;
        write!(f, " router={}", self.is_router)?;
        write!(f, " permanent={}", self.permanent)?;
        write!(f, " asked={}", self.asked)?;
        write!(f, " held={}", self.held)?;
        write!(f, " expire={:?}", self.expire)
    }
}
