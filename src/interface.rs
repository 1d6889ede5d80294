//! Interfaces and their IPv6 addresses.
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use ip_network::Ipv6Network;

use crate::config::InterfaceSettings;
use crate::models::{LinkAddr, LinkType};
use crate::neighbors::{NeighborCache, OnLinkPrefixes};
use crate::utilities::is_link_local;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressFlags {
    /// DAD has not completed yet, the address must not be used.
    pub tentative: bool,
    /// DAD found another node using the address.
    pub duplicated: bool,
    /// The link went down; DAD will run again when it comes back.
    pub detached: bool,
}

/// An IPv6 address assigned to an interface.
#[derive(Debug)]
pub struct InterfaceAddress {
    addr: Ipv6Addr,
    prefix_len: u8,
    anycast: bool,
    nodad: bool,
    ifindex: u32,
    flags: Mutex<AddressFlags>,
}

impl InterfaceAddress {
    pub(crate) fn new(
        addr: Ipv6Addr,
        prefix_len: u8,
        anycast: bool,
        nodad: bool,
        ifindex: u32,
    ) -> Self {
        InterfaceAddress {
            addr,
            prefix_len,
            anycast,
            nodad,
            ifindex,
            flags: Mutex::new(AddressFlags::default()),
        }
    }

    pub fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn is_anycast(&self) -> bool {
        self.anycast
    }

    /// Whether DAD was explicitly disabled for this address.
    pub fn is_nodad(&self) -> bool {
        self.nodad
    }

    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    pub fn flags(&self) -> AddressFlags {
        *self.flags.lock().unwrap()
    }

    pub fn is_tentative(&self) -> bool {
        self.flags().tentative
    }

    pub fn is_duplicated(&self) -> bool {
        self.flags().duplicated
    }

    /// Whether the address can be used as a source or answered for.
    pub fn is_usable(&self) -> bool {
        let flags = self.flags();
        !flags.tentative && !flags.duplicated && !flags.detached
    }

    pub(crate) fn update_flags<F: FnOnce(&mut AddressFlags)>(&self, f: F) {
        f(&mut self.flags.lock().unwrap());
    }

    /// The network the address belongs to.
    pub fn network(&self) -> Option<Ipv6Network> {
        Ipv6Network::new_truncate(self.addr, self.prefix_len).ok()
    }
}

impl Display for InterfaceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let flags = self.flags();
        write!(f, "{}/{}", self.addr, self.prefix_len)?;
        if self.anycast {
            write!(f, " anycast")?;
        }
        if flags.tentative {
            write!(f, " tentative")?;
        }
        if flags.duplicated {
            write!(f, " duplicated")?;
        }
        if flags.detached {
            write!(f, " detached")?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct LinkFlags {
    up: bool,
    running: bool,
}

/// A network interface as seen by Neighbor Discovery.
///
/// Owns the neighbor cache of the link.
pub struct Interface {
    index: u32,
    name: String,
    link_type: LinkType,
    lladdr: Option<LinkAddr>,
    flags: Mutex<LinkFlags>,
    settings: Mutex<InterfaceSettings>,
    reachable_time: Mutex<Duration>,
    addresses: RwLock<Vec<Arc<InterfaceAddress>>>,
    onlink: RwLock<OnLinkPrefixes>,
    cache: NeighborCache,
}

impl Interface {
    /// A new interface, up and running.
    pub fn new(
        index: u32,
        name: &str,
        link_type: LinkType,
        lladdr: Option<LinkAddr>,
        settings: InterfaceSettings,
    ) -> Self {
        Interface {
            index,
            name: name.to_string(),
            link_type,
            lladdr,
            flags: Mutex::new(LinkFlags {
                up: true,
                running: true,
            }),
            reachable_time: Mutex::new(settings.base_reachable_time),
            settings: Mutex::new(settings),
            addresses: RwLock::new(Vec::new()),
            onlink: RwLock::new(OnLinkPrefixes::default()),
            cache: NeighborCache::default(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// The hardware address of the interface.
    pub fn lladdr(&self) -> Option<LinkAddr> {
        self.lladdr
    }

    /// Length of link-layer addresses on this link.
    pub fn addr_len(&self) -> usize {
        self.link_type.addr_len()
    }

    pub fn is_up(&self) -> bool {
        self.flags.lock().unwrap().up
    }

    pub fn is_running(&self) -> bool {
        self.flags.lock().unwrap().running
    }

    pub fn set_up(&self, up: bool) {
        self.flags.lock().unwrap().up = up;
    }

    pub fn set_running(&self, running: bool) {
        self.flags.lock().unwrap().running = running;
    }

    pub fn settings(&self) -> InterfaceSettings {
        *self.settings.lock().unwrap()
    }

    pub fn update_settings<F: FnOnce(&mut InterfaceSettings)>(&self, f: F) {
        f(&mut self.settings.lock().unwrap());
    }

    /// Whether IPv6 is disabled on this interface.
    pub fn is_disabled(&self) -> bool {
        self.settings().ifdisabled
    }

    /// The randomized reachable time currently in use.
    pub fn reachable_time(&self) -> Duration {
        *self.reachable_time.lock().unwrap()
    }

    pub(crate) fn set_reachable_time(&self, reachable_time: Duration) {
        *self.reachable_time.lock().unwrap() = reachable_time;
    }

    pub fn addresses(&self) -> Vec<Arc<InterfaceAddress>> {
        self.addresses.read().unwrap().clone()
    }

    pub fn find_address(&self, addr: Ipv6Addr) -> Option<Arc<InterfaceAddress>> {
        self.addresses
            .read()
            .unwrap()
            .iter()
            .find(|ia| ia.addr() == addr)
            .cloned()
    }

    /// Add an address, unless it is already assigned.
    pub(crate) fn insert_address(&self, ia: Arc<InterfaceAddress>) -> bool {
        let mut addresses = self.addresses.write().unwrap();
        if addresses.iter().any(|other| other.addr() == ia.addr()) {
            return false;
        }
        addresses.push(ia);
        true
    }

    pub(crate) fn take_address(&self, addr: Ipv6Addr) -> Option<Arc<InterfaceAddress>> {
        let mut addresses = self.addresses.write().unwrap();
        let position = addresses.iter().position(|ia| ia.addr() == addr)?;
        Some(addresses.remove(position))
    }

    /// Pick the source address of a solicitation for `target`.
    ///
    /// Prefers `hint` (the source of the packet that triggered resolution) when it is
    /// one of our usable addresses, then a usable address on the same prefix as the
    /// target, then any usable link-local address.
    pub fn select_source(&self, target: Ipv6Addr, hint: Option<Ipv6Addr>) -> Option<Ipv6Addr> {
        let addresses = self.addresses.read().unwrap();
        let usable = || addresses.iter().filter(|ia| ia.is_usable() && !ia.is_anycast());
        if let Some(hint) = hint {
            if usable().any(|ia| ia.addr() == hint) {
                return Some(hint);
            }
        }
        usable()
            .find(|ia| ia.network().map_or(false, |n| n.contains(target)))
            .or_else(|| usable().find(|ia| is_link_local(ia.addr())))
            .map(|ia| ia.addr())
    }

    pub fn onlink(&self) -> std::sync::RwLockReadGuard<'_, OnLinkPrefixes> {
        self.onlink.read().unwrap()
    }

    pub(crate) fn onlink_mut(&self) -> std::sync::RwLockWriteGuard<'_, OnLinkPrefixes> {
        self.onlink.write().unwrap()
    }

    pub fn cache(&self) -> &NeighborCache {
        &self.cache
    }
}

impl Display for Interface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} index={} link={}", self.name, self.index, self.link_type)?;
        if let Some(lladdr) = self.lladdr {
            write!(f, " lladdr={}", lladdr)?;
        }
        write!(f, " up={} running={}", self.is_up(), self.is_running())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;
    use std::sync::Arc;

    use crate::config::InterfaceSettings;
    use crate::interface::{Interface, InterfaceAddress};
    use crate::models::LinkType;

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_select_source() {
        let ifp = Interface::new(
            1,
            "eth0",
            LinkType::Ethernet,
            None,
            InterfaceSettings::default(),
        );
        let ll = Arc::new(InterfaceAddress::new(addr("fe80::1"), 64, false, false, 1));
        let global = Arc::new(InterfaceAddress::new(addr("2001:db8::1"), 64, false, false, 1));
        let tentative = Arc::new(InterfaceAddress::new(addr("2001:db8::2"), 64, false, false, 1));
        tentative.update_flags(|flags| flags.tentative = true);
        assert!(ifp.insert_address(ll));
        assert!(ifp.insert_address(global));
        assert!(ifp.insert_address(tentative));
        assert!(!ifp.insert_address(Arc::new(InterfaceAddress::new(
            addr("fe80::1"),
            64,
            false,
            false,
            1
        ))));

        assert_eq!(
            ifp.select_source(addr("2001:db8::99"), None),
            Some(addr("2001:db8::1"))
        );
        assert_eq!(
            ifp.select_source(addr("2001:db8::99"), Some(addr("fe80::1"))),
            Some(addr("fe80::1"))
        );
        // Tentative addresses are never selected.
        assert_eq!(
            ifp.select_source(addr("2001:db8::99"), Some(addr("2001:db8::2"))),
            Some(addr("2001:db8::1"))
        );
        assert_eq!(
            ifp.select_source(addr("2001:db9::99"), None),
            Some(addr("fe80::1"))
        );
    }
}
