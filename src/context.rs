//! The Neighbor Discovery engine: interfaces, addresses, link state and time.
use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::NdConfig;
use crate::dad::DadEngine;
use crate::hooks::Hooks;
use crate::interface::{Interface, InterfaceAddress};
use crate::neighbors::NeighborEntry;
use crate::statistics::NdStatistics;
use crate::timer::{Task, TimerId, TimerQueue, WorkQueue};
use crate::utilities::link_local_from_lladdr;

/// Options for [`NdContext::add_address`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressOptions {
    pub anycast: bool,
    /// Skip DAD for this address.
    pub nodad: bool,
    /// Delay before the first DAD probe.
    /// Defaults to a random delay below `max_rtr_solicitation_delay`.
    pub dad_delay: Option<Duration>,
}

/// Shared state of the Neighbor Discovery engine.
///
/// All operations take `&self` and can be called from multiple threads.
/// Time is virtual: it only moves forward through [`NdContext::advance`]
/// and [`NdContext::advance_to`], which run the timers that expired.
pub struct NdContext {
    config: NdConfig,
    hooks: Hooks,
    interfaces: RwLock<HashMap<u32, Arc<Interface>>>,
    dad: DadEngine,
    timers: Mutex<TimerQueue>,
    work: Mutex<WorkQueue>,
    statistics: Arc<Mutex<NdStatistics>>,
    rng: Mutex<SmallRng>,
}

impl NdContext {
    pub fn new(config: NdConfig, hooks: Hooks) -> Self {
        Self::with_rng(config, hooks, SmallRng::from_entropy())
    }

    /// A context whose random delays and nonces are derived from `seed`.
    pub fn with_seed(config: NdConfig, hooks: Hooks, seed: u64) -> Self {
        Self::with_rng(config, hooks, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: NdConfig, hooks: Hooks, rng: SmallRng) -> Self {
        let mut timers = TimerQueue::default();
        if !config.prune_interval.is_zero() {
            timers.schedule(config.prune_interval, Task::Sweep);
        }
        debug!("{}", config);
        NdContext {
            config,
            hooks,
            interfaces: RwLock::new(HashMap::new()),
            dad: DadEngine::default(),
            timers: Mutex::new(timers),
            work: Mutex::new(WorkQueue::default()),
            statistics: Arc::new(Mutex::new(NdStatistics::default())),
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &NdConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn statistics(&self) -> &Arc<Mutex<NdStatistics>> {
        &self.statistics
    }

    pub(crate) fn dad(&self) -> &DadEngine {
        &self.dad
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap()
    }

    pub fn interface(&self, index: u32) -> Option<Arc<Interface>> {
        self.interfaces.read().unwrap().get(&index).cloned()
    }

    /// Every attached interface, ordered by index.
    pub fn interfaces(&self) -> Vec<Arc<Interface>> {
        let mut interfaces: Vec<_> = self.interfaces.read().unwrap().values().cloned().collect();
        interfaces.sort_by_key(|ifp| ifp.index());
        interfaces
    }

    /// Attach an interface to the engine.
    ///
    /// A link-local address is formed from the hardware address when
    /// `auto_linklocal` is set, and goes through DAD like any other address.
    pub fn attach(&self, ifp: Interface) -> Result<Arc<Interface>> {
        let ifp = Arc::new(ifp);
        {
            let mut interfaces = self.interfaces.write().unwrap();
            if interfaces.contains_key(&ifp.index()) {
                bail!("interface index {} is already attached", ifp.index());
            }
            interfaces.insert(ifp.index(), ifp.clone());
        }
        ifp.set_reachable_time(self.random_reachable_time(ifp.settings().base_reachable_time));
        info!("attached {}", ifp);

        if ifp.settings().auto_linklocal {
            if let Some(addr) = ifp.lladdr().and_then(|lladdr| link_local_from_lladdr(&lladdr)) {
                self.add_address(&ifp, addr, 64, AddressOptions::default())
                    .with_context(|| format!("{}: cannot configure link-local address", ifp.name()))?;
            }
        }
        Ok(ifp)
    }

    /// Detach an interface: stop its probes and flush its neighbor cache.
    pub fn detach(&self, ifp: &Interface) {
        for ia in ifp.addresses() {
            self.dad_stop(ifp, ia.addr());
        }
        for entry in ifp.cache().snapshot() {
            self.delete_entry(ifp, &entry);
        }
        self.interfaces.write().unwrap().remove(&ifp.index());
        info!("detached {}", ifp.name());
    }

    /// Change the base reachable time of an interface and draw a new randomized reachable time.
    pub fn set_base_reachable_time(&self, ifp: &Interface, base_reachable_time: Duration) {
        ifp.update_settings(|settings| settings.base_reachable_time = base_reachable_time);
        ifp.set_reachable_time(self.random_reachable_time(base_reachable_time));
    }

    /// A uniformly distributed value between 0.5 and 1.5 times `base` (RFC 4861 section 6.3.2).
    fn random_reachable_time(&self, base: Duration) -> Duration {
        let factor: f64 = self.rng().gen_range(0.5..1.5);
        base.mul_f64(factor)
    }

    /// A random delay before the first DAD probe (RFC 4862 section 5.4.2).
    fn random_dad_delay(&self) -> Duration {
        let max = self.config.max_rtr_solicitation_delay;
        if max.is_zero() {
            return Duration::ZERO;
        }
        let millis = self.rng().gen_range(0..max.as_millis().max(1) as u64);
        Duration::from_millis(millis)
    }

    /// Assign an address to an interface and start DAD on it.
    ///
    /// The address is tentative until DAD completes. On a link that is not
    /// running it is detached instead, and DAD starts when the link comes up.
    pub fn add_address(
        &self,
        ifp: &Interface,
        addr: Ipv6Addr,
        prefix_len: u8,
        options: AddressOptions,
    ) -> Result<Arc<InterfaceAddress>> {
        if addr.is_multicast() || addr.is_unspecified() {
            bail!("{}: invalid interface address {}", ifp.name(), addr);
        }
        if prefix_len > 128 {
            bail!("{}: invalid prefix length {}", ifp.name(), prefix_len);
        }
        let ia = Arc::new(InterfaceAddress::new(
            addr,
            prefix_len,
            options.anycast,
            options.nodad,
            ifp.index(),
        ));
        let needs_dad = self.needs_dad(ifp, &ia);
        ia.update_flags(|flags| {
            if ifp.is_running() {
                flags.tentative = needs_dad;
            } else {
                flags.detached = true;
            }
        });
        if !ifp.insert_address(ia.clone()) {
            bail!("{}: address {} is already assigned", ifp.name(), addr);
        }
        let network = ifp.onlink_mut().add(addr, prefix_len)?;
        info!("{}: added address {} (on-link {})", ifp.name(), ia, network);

        if ia.is_tentative() {
            let delay = options.dad_delay.unwrap_or_else(|| self.random_dad_delay());
            self.dad_start(ifp, addr, delay);
        } else if ia.is_usable() {
            self.hooks.addresses.on_address_activated(ifp, &ia);
        }
        Ok(ia)
    }

    /// Remove an address from an interface.
    ///
    /// Its probe is stopped, and neighbors of its prefix are purged once
    /// no other address makes that prefix on-link.
    pub fn remove_address(&self, ifp: &Interface, addr: Ipv6Addr) -> Option<Arc<InterfaceAddress>> {
        self.dad_stop(ifp, addr);
        let ia = ifp.take_address(addr)?;
        let removed = ifp.onlink_mut().remove(addr, ia.prefix_len());
        info!("{}: removed address {}", ifp.name(), ia);
        if let Some(network) = removed {
            self.purge_prefix(ifp, network);
        }
        Some(ia)
    }

    fn needs_dad(&self, ifp: &Interface, ia: &InterfaceAddress) -> bool {
        !ia.is_anycast()
            && !ia.is_nodad()
            && !ifp.settings().dad_disabled
            && self.config.dad_count > 0
    }

    /// The link went down: stop DAD and detach every address.
    pub fn link_down(&self, ifp: &Interface) {
        ifp.set_running(false);
        for ia in ifp.addresses() {
            self.dad_stop(ifp, ia.addr());
            if !ia.flags().detached {
                debug!("{}: {} marked detached", ifp.name(), ia.addr());
                ia.update_flags(|flags| {
                    flags.detached = true;
                    flags.tentative = false;
                    flags.duplicated = false;
                });
            }
        }
        info!("{}: link down", ifp.name());
    }

    /// The link came back: detached addresses become tentative and go through DAD again.
    pub fn link_up(&self, ifp: &Interface) {
        ifp.set_running(true);
        info!("{}: link up", ifp.name());
        if !ifp.is_up() {
            return;
        }
        for ia in ifp.addresses() {
            if ia.flags().detached {
                let needs_dad = self.needs_dad(ifp, &ia);
                ia.update_flags(|flags| {
                    flags.detached = false;
                    flags.tentative |= needs_dad;
                });
                if needs_dad {
                    debug!("{}: {} marked tentative", ifp.name(), ia.addr());
                } else if !ia.is_tentative() {
                    self.hooks.addresses.on_address_activated(ifp, &ia);
                }
            }
            if ia.is_tentative() {
                ia.update_flags(|flags| flags.duplicated = false);
                let delay = self.random_dad_delay() + Duration::from_millis(1);
                self.dad_start(ifp, ia.addr(), delay);
            }
        }
    }

    /// The current virtual time.
    pub fn now(&self) -> Duration {
        self.timers.lock().unwrap().now()
    }

    /// Move the clock forward by `elapsed`, running every timer that expires.
    pub fn advance(&self, elapsed: Duration) {
        let until = self.now() + elapsed;
        self.advance_to(until);
    }

    /// Move the clock forward to `until`, running every timer that expires.
    ///
    /// Timers run in deadline order, each one at its own deadline.
    pub fn advance_to(&self, until: Duration) {
        loop {
            let task = self.timers.lock().unwrap().pop_expired(until);
            let Some(task) = task else {
                break;
            };
            self.work.lock().unwrap().push(task);
            self.run_pending();
        }
        self.timers.lock().unwrap().set_now(until);
    }

    /// Run the tasks handed over by expired timers.
    pub fn run_pending(&self) {
        loop {
            let task = self.work.lock().unwrap().pop();
            let Some(task) = task else {
                break;
            };
            self.run_task(task);
        }
    }

    /// The deadline of the next timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.lock().unwrap().next_deadline()
    }

    /// Number of timers waiting to expire.
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    pub(crate) fn schedule(&self, after: Duration, task: Task) -> TimerId {
        self.timers.lock().unwrap().schedule(after, task)
    }

    pub(crate) fn cancel_timer(&self, timer: TimerId) {
        self.timers.lock().unwrap().cancel(timer);
    }

    pub(crate) fn schedule_neighbor_timer(
        &self,
        entry: &Arc<NeighborEntry>,
        generation: u64,
        after: Duration,
    ) -> TimerId {
        self.schedule(
            after,
            Task::Neighbor {
                entry: Arc::downgrade(entry),
                generation,
            },
        )
    }

    fn run_task(&self, task: Task) {
        trace!("running {:?}", task);
        match task {
            Task::Neighbor { entry, generation } => {
                if let Some(entry) = entry.upgrade() {
                    self.neighbor_timer(&entry, generation);
                }
            }
            Task::Dad { id, generation } => self.dad_timer(id, generation),
            Task::Sweep => {
                self.sweep();
                self.schedule(self.config.prune_interval, Task::Sweep);
            }
        }
    }
}
