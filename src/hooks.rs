//! Collaborators of the Neighbor Discovery engine.
//!
//! The engine never touches the network or the routing table itself: frames
//! are handed to a [`LinkOutput`], router role changes are reported to a
//! [`RouterList`] and address state changes to [`AddressEvents`].
use std::net::Ipv6Addr;
use std::sync::Arc;

use anyhow::Result;

use crate::interface::{Interface, InterfaceAddress};
use crate::models::{HeldPacket, LinkAddr};

/// The link-layer transmission path.
pub trait LinkOutput: Send + Sync {
    /// Transmit an IPv6 packet to a link-layer destination.
    fn transmit(&self, ifp: &Interface, dst: LinkAddr, packet: &[u8]) -> Result<()>;

    /// Packets dropped because resolution of `dst` failed.
    /// This is where the IP layer would send ICMPv6 destination unreachable errors.
    fn unresolved(&self, _ifp: &Interface, _dst: Ipv6Addr, _packets: Vec<HeldPacket>) {}
}

/// The default router list.
pub trait RouterList: Send + Sync {
    /// A neighbor stopped advertising itself as a router.
    fn on_router_flag_cleared(&self, _addr: Ipv6Addr, _ifp: &Interface) {}

    /// Remove routes whose next-hop is `addr`.
    fn flush_routes(&self, _addr: Ipv6Addr, _ifp: &Interface) {}

    /// The cache entry of a router was deleted.
    fn on_router_removed(&self, _addr: Ipv6Addr, _ifp: &Interface) {}
}

/// The address configuration subsystem.
pub trait AddressEvents: Send + Sync {
    /// DAD completed without collision: the address can be used.
    fn on_address_activated(&self, _ifp: &Interface, _addr: &InterfaceAddress) {}

    /// DAD detected another node using the address.
    fn on_address_duplicated(&self, _ifp: &Interface, _addr: &InterfaceAddress) {}

    /// IPv6 was disabled on the interface after a hardware address collision.
    fn on_interface_disabled(&self, _ifp: &Interface) {}
}

/// Router list that ignores every notification.
#[derive(Default)]
pub struct NoRouters;

impl RouterList for NoRouters {}

/// Address event sink that ignores every notification.
#[derive(Default)]
pub struct NoAddressEvents;

impl AddressEvents for NoAddressEvents {}

#[derive(Clone)]
pub struct Hooks {
    pub output: Arc<dyn LinkOutput>,
    pub routers: Arc<dyn RouterList>,
    pub addresses: Arc<dyn AddressEvents>,
}

impl Hooks {
    pub fn new(output: Arc<dyn LinkOutput>) -> Self {
        Hooks {
            output,
            routers: Arc::new(NoRouters),
            addresses: Arc::new(NoAddressEvents),
        }
    }

    pub fn with_routers(mut self, routers: Arc<dyn RouterList>) -> Self {
        self.routers = routers;
        self
    }

    pub fn with_address_events(mut self, addresses: Arc<dyn AddressEvents>) -> Self {
        self.addresses = addresses;
        self
    }
}
