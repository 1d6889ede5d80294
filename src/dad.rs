//! Duplicate Address Detection (RFC 4862 section 5.4, RFC 7527).
//!
//! Every tentative address under probe has a DAD entry in a single
//! engine-wide list. The list is small, so one lock serializes every
//! change to it, including timer expiries. Entries only hold a weak
//! reference to their address: removing the address stops its probe,
//! and a timer that fires after that finds nothing to act on.
//!
//! Transmissions and notifications are performed after the list lock is released.
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use circular_queue::CircularQueue;
use log::{debug, error, info, trace, warn};
use rand::Rng;

use crate::context::NdContext;
use crate::interface::{Interface, InterfaceAddress};
use crate::models::{LinkAddr, Nonce, Solicitation};
use crate::timer::{Task, TimerId};
use crate::utilities::{eui64_interface_id, interface_id, solicited_node};

/// Number of recently sent nonces remembered to recognize looped back probes.
pub const NONCE_HISTORY: usize = 3;

struct DadEntry {
    id: u64,
    address: Weak<InterfaceAddress>,
    ifindex: u32,
    target: Ipv6Addr,
    /// Number of probes to send.
    count: u32,
    /// Probes sent.
    ns_ocount: u32,
    /// Probe attempts, including those skipped while the link was down.
    ns_tcount: u32,
    /// Probes received from other nodes.
    ns_icount: u32,
    /// Advertisements received.
    na_icount: u32,
    /// Our own probes received back.
    ns_lcount: u32,
    nonces: CircularQueue<Nonce>,
    timer: Option<TimerId>,
    timer_generation: u64,
}

impl DadEntry {
    fn progress(&self) -> DadProgress {
        DadProgress {
            addr: self.target,
            count: self.count,
            ns_sent: self.ns_ocount,
            ns_tried: self.ns_tcount,
            ns_received: self.ns_icount,
            na_received: self.na_icount,
            looped_back: self.ns_lcount,
        }
    }
}

/// Counters of a probe in progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DadProgress {
    pub addr: Ipv6Addr,
    pub count: u32,
    pub ns_sent: u32,
    pub ns_tried: u32,
    pub ns_received: u32,
    pub na_received: u32,
    pub looped_back: u32,
}

impl Display for DadProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "addr={}", self.addr)?;
        write!(f, " count={}", self.count)?;
        write!(f, " ns_sent={}", self.ns_sent)?;
        write!(f, " ns_tried={}", self.ns_tried)?;
        write!(f, " ns_received={}", self.ns_received)?;
        write!(f, " na_received={}", self.na_received)?;
        write!(f, " looped_back={}", self.looped_back)
    }
}

#[derive(Default)]
struct DadList {
    entries: Vec<DadEntry>,
    next_id: u64,
}

impl DadList {
    fn position(&self, ifindex: u32, target: Ipv6Addr) -> Option<usize> {
        self.entries
            .iter()
            .position(|dp| dp.ifindex == ifindex && dp.target == target)
    }
}

#[derive(Default)]
pub(crate) struct DadEngine {
    list: Mutex<DadList>,
}

/// Work to do once the list lock is released.
enum DadEvent {
    Probe(Solicitation),
    Activated(Arc<InterfaceAddress>),
    Duplicated {
        address: Arc<InterfaceAddress>,
        disable: bool,
    },
}

impl NdContext {
    /// Start DAD on a tentative address of `ifp`, sending the first probe after `initial_delay`.
    ///
    /// Addresses that do not need DAD (anycast, DAD disabled, zero probe count)
    /// are activated immediately. Nothing happens if a probe is already running,
    /// and the address stays tentative if the interface is down.
    pub fn dad_start(&self, ifp: &Interface, addr: Ipv6Addr, initial_delay: Duration) {
        let Some(ia) = ifp.find_address(addr) else {
            debug!("{}: dad_start on unknown address {}", ifp.name(), addr);
            return;
        };
        if !ia.is_tentative() {
            debug!("{}: dad_start on non-tentative address {}", ifp.name(), addr);
            return;
        }
        if ia.is_anycast()
            || ia.is_nodad()
            || ifp.settings().dad_disabled
            || self.config().dad_count == 0
        {
            ia.update_flags(|flags| flags.tentative = false);
            self.dad_dispatch(ifp, vec![DadEvent::Activated(ia)]);
            return;
        }
        if !ifp.is_up() {
            debug!("{}: {} stays tentative, interface is down", ifp.name(), addr);
            return;
        }

        let mut events = vec![];
        {
            let mut list = self.dad().list.lock().unwrap();
            if list.position(ifp.index(), addr).is_some() {
                debug!("{}: DAD already running for {}", ifp.name(), addr);
                return;
            }
            list.next_id += 1;
            let mut dp = DadEntry {
                id: list.next_id,
                address: Arc::downgrade(&ia),
                ifindex: ifp.index(),
                target: addr,
                count: self.config().dad_count,
                ns_ocount: 0,
                ns_tcount: 0,
                ns_icount: 0,
                na_icount: 0,
                ns_lcount: 0,
                nonces: CircularQueue::with_capacity(NONCE_HISTORY),
                timer: None,
                timer_generation: 0,
            };
            if initial_delay.is_zero() {
                self.dad_arm(&mut dp, ifp.settings().retrans_timer);
                events.extend(self.dad_probe(ifp, &mut dp).map(DadEvent::Probe));
            } else {
                self.dad_arm(&mut dp, initial_delay);
            }
            list.entries.push(dp);
        }
        info!(
            "{}: starting DAD for {} (delay {:?})",
            ifp.name(),
            addr,
            initial_delay
        );
        self.dad_dispatch(ifp, events);
    }

    /// Stop DAD on an address. Stopping an address without a probe running is a no-op.
    pub fn dad_stop(&self, ifp: &Interface, addr: Ipv6Addr) {
        let mut list = self.dad().list.lock().unwrap();
        if let Some(position) = list.position(ifp.index(), addr) {
            self.dad_release(list.entries.remove(position));
            trace!("{}: DAD stopped for {}", ifp.name(), addr);
        }
    }

    /// Counters of the probe running on an address, if any.
    pub fn dad_progress(&self, ifp: &Interface, addr: Ipv6Addr) -> Option<DadProgress> {
        let list = self.dad().list.lock().unwrap();
        list.position(ifp.index(), addr)
            .map(|position| list.entries[position].progress())
    }

    pub(crate) fn dad_timer(&self, id: u64, generation: u64) {
        let mut events = vec![];
        let ifp;
        {
            let mut list = self.dad().list.lock().unwrap();
            let Some(position) = list
                .entries
                .iter()
                .position(|dp| dp.id == id && dp.timer_generation == generation)
            else {
                return;
            };
            let (Some(ia), Some(interface)) = (
                list.entries[position].address.upgrade(),
                self.interface(list.entries[position].ifindex),
            ) else {
                list.entries.remove(position);
                return;
            };
            ifp = interface;

            if ia.is_duplicated() {
                warn!("{}: DAD timer for duplicated address {}", ifp.name(), ia.addr());
                list.entries.remove(position);
                return;
            }
            if !ia.is_tentative() {
                warn!("{}: DAD timer for non-tentative address {}", ifp.name(), ia.addr());
                list.entries.remove(position);
                return;
            }

            let dp = &mut list.entries[position];
            dp.timer = None;
            if dp.ns_ocount < dp.count {
                // Give up only while probes are still owed.
                if dp.ns_tcount >= self.config().dad_max_tries {
                    error!(
                        "{}: could not run DAD for {}, interface not running after {} tries",
                        ifp.name(),
                        dp.target,
                        dp.ns_tcount
                    );
                    list.entries.remove(position);
                    return;
                }
                self.dad_arm(dp, ifp.settings().retrans_timer);
                events.extend(self.dad_probe(&ifp, dp).map(DadEvent::Probe));
            } else {
                // Enough probes and no sign of another user.
                list.entries.remove(position);
                if !ifp.is_disabled() {
                    ia.update_flags(|flags| flags.tentative = false);
                    events.push(DadEvent::Activated(ia));
                }
            }
        }
        self.dad_dispatch(&ifp, events);
    }

    /// A probe (NS from the unspecified address) for one of our tentative addresses.
    pub(crate) fn dad_ns_input(
        &self,
        ifp: &Interface,
        ia: &Arc<InterfaceAddress>,
        nonce: Option<Nonce>,
    ) {
        let events = {
            let mut list = self.dad().list.lock().unwrap();
            let position = list.position(ifp.index(), ia.addr());
            if let (Some(position), Some(nonce)) = (position, nonce) {
                let dp = &mut list.entries[position];
                if dp.nonces.iter().any(|sent| *sent == nonce) {
                    dp.ns_lcount += 1;
                    self.statistics().lock().unwrap().dad_loopbacks += 1;
                    debug!(
                        "{}: looped back DAD probe for {} (nonce {})",
                        ifp.name(),
                        ia.addr(),
                        hex::encode(nonce)
                    );
                    return;
                }
            }
            if let Some(position) = position {
                list.entries[position].ns_icount += 1;
            }
            self.dad_duplicated(&mut list, ifp, ia, None)
        };
        self.dad_dispatch(ifp, events);
    }

    /// An advertisement for one of our tentative addresses.
    pub(crate) fn dad_na_input(
        &self,
        ifp: &Interface,
        ia: &Arc<InterfaceAddress>,
        lladdr: Option<LinkAddr>,
    ) {
        let events = {
            let mut list = self.dad().list.lock().unwrap();
            if let Some(position) = list.position(ifp.index(), ia.addr()) {
                list.entries[position].na_icount += 1;
            }
            self.dad_duplicated(&mut list, ifp, ia, lladdr)
        };
        self.dad_dispatch(ifp, events);
    }

    fn dad_duplicated(
        &self,
        list: &mut DadList,
        ifp: &Interface,
        ia: &Arc<InterfaceAddress>,
        sender: Option<LinkAddr>,
    ) -> Vec<DadEvent> {
        let progress = list
            .position(ifp.index(), ia.addr())
            .map(|position| {
                let dp = list.entries.remove(position);
                let progress = dp.progress();
                self.dad_release(dp);
                progress
            })
            .unwrap_or(DadProgress {
                addr: ia.addr(),
                count: 0,
                ns_sent: 0,
                ns_tried: 0,
                ns_received: 0,
                na_received: 0,
                looped_back: 0,
            });
        error!(
            "{}: DAD detected duplicate IPv6 address {}: NS in/out/loopback={}/{}/{}, NA in={} sender={}",
            ifp.name(),
            ia.addr(),
            progress.ns_received,
            progress.ns_sent,
            progress.looped_back,
            progress.na_received,
            sender.unwrap_or(LinkAddr::EMPTY)
        );
        ia.update_flags(|flags| {
            flags.tentative = false;
            flags.duplicated = true;
        });
        self.statistics().lock().unwrap().dad_duplicates += 1;

        // An address formed from a hardware address that is supposed to be unique
        // means that two interfaces have the same hardware address.
        let disable = ifp.link_type().has_global_hwid()
            && ifp
                .lladdr()
                .and_then(|lladdr| eui64_interface_id(&lladdr))
                .map_or(false, |iid| iid == interface_id(ia.addr()));
        if disable {
            ifp.update_settings(|settings| settings.ifdisabled = true);
            error!(
                "{}: possible hardware address duplication detected, disabling IPv6",
                ifp.name()
            );
        }
        vec![DadEvent::Duplicated {
            address: ia.clone(),
            disable,
        }]
    }

    /// Build the next probe of an entry. The attempt is counted even if the link is not running.
    fn dad_probe(&self, ifp: &Interface, dp: &mut DadEntry) -> Option<Solicitation> {
        dp.ns_tcount += 1;
        if !ifp.is_up() || !ifp.is_running() {
            trace!("{}: link not running, DAD probe for {} deferred", ifp.name(), dp.target);
            return None;
        }
        dp.ns_ocount += 1;
        let nonce = if self.config().dad_enhanced {
            let nonce: Nonce = self.rng().gen();
            dp.nonces.push(nonce);
            Some(nonce)
        } else {
            None
        };
        Some(Solicitation {
            src_addr: Ipv6Addr::UNSPECIFIED,
            dst_addr: solicited_node(dp.target),
            target: dp.target,
            source_lladdr: None,
            nonce,
        })
    }

    fn dad_arm(&self, dp: &mut DadEntry, after: Duration) {
        if let Some(timer) = dp.timer.take() {
            self.cancel_timer(timer);
        }
        dp.timer_generation += 1;
        dp.timer = Some(self.schedule(
            after,
            Task::Dad {
                id: dp.id,
                generation: dp.timer_generation,
            },
        ));
    }

    /// Drop an entry removed from the list, with its pending timer.
    fn dad_release(&self, dp: DadEntry) {
        if let Some(timer) = dp.timer {
            self.cancel_timer(timer);
        }
    }

    fn dad_dispatch(&self, ifp: &Interface, events: Vec<DadEvent>) {
        for event in events {
            match event {
                DadEvent::Probe(probe) => {
                    trace!("{}: DAD probe {}", ifp.name(), probe);
                    self.send_solicitation(ifp, &probe);
                }
                DadEvent::Activated(ia) => {
                    info!("{}: address {} is now valid", ifp.name(), ia.addr());
                    self.hooks().addresses.on_address_activated(ifp, &ia);
                }
                DadEvent::Duplicated { address, disable } => {
                    self.hooks().addresses.on_address_duplicated(ifp, &address);
                    if disable {
                        self.hooks().addresses.on_interface_disabled(ifp);
                    }
                }
            }
        }
    }
}
