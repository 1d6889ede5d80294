use pnet::packet::icmpv6::{Icmpv6Type, Icmpv6Types};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Link layer type of an interface.
#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum LinkType {
    /// 14-byte Ethernet header, 6-byte hardware address.
    Ethernet,
    /// IEEE 802.11, 6-byte hardware address.
    Ieee80211,
    /// Loopback interface (no link-layer addressing).
    Loopback,
    /// L3 link (e.g. VPN or IP-in-IP tunnel).
    Tunnel,
}

impl LinkType {
    /// Whether next-hops on this link must be resolved through the neighbor cache.
    pub fn needs_cache(&self) -> bool {
        matches!(self, LinkType::Ethernet | LinkType::Ieee80211)
    }

    /// Whether the hardware address of this link type is supposed to be globally unique.
    ///
    /// On such links an address formed from the hardware address which fails DAD
    /// indicates a hardware address collision.
    pub fn has_global_hwid(&self) -> bool {
        matches!(self, LinkType::Ethernet | LinkType::Ieee80211)
    }

    /// Length in bytes of a link-layer address on this link.
    pub fn addr_len(&self) -> usize {
        match self {
            LinkType::Ethernet | LinkType::Ieee80211 => 6,
            LinkType::Loopback | LinkType::Tunnel => 0,
        }
    }
}

/// Neighbor Discovery message types handled by this crate.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum NdMessageType {
    RouterSolicit,
    RouterAdvert,
    NeighborSolicit,
    NeighborAdvert,
    Redirect,
}

impl From<NdMessageType> for Icmpv6Type {
    fn from(value: NdMessageType) -> Self {
        match value {
            NdMessageType::RouterSolicit => Icmpv6Types::RouterSolicit,
            NdMessageType::RouterAdvert => Icmpv6Types::RouterAdvert,
            NdMessageType::NeighborSolicit => Icmpv6Types::NeighborSolicit,
            NdMessageType::NeighborAdvert => Icmpv6Types::NeighborAdvert,
            NdMessageType::Redirect => Icmpv6Types::Redirect,
        }
    }
}

impl From<NdMessageType> for u8 {
    fn from(value: NdMessageType) -> Self {
        let val: Icmpv6Type = value.into();
        val.0
    }
}

impl TryFrom<Icmpv6Type> for NdMessageType {
    type Error = Icmpv6Type;

    fn try_from(value: Icmpv6Type) -> Result<Self, Self::Error> {
        match value {
            Icmpv6Types::RouterSolicit => Ok(NdMessageType::RouterSolicit),
            Icmpv6Types::RouterAdvert => Ok(NdMessageType::RouterAdvert),
            Icmpv6Types::NeighborSolicit => Ok(NdMessageType::NeighborSolicit),
            Icmpv6Types::NeighborAdvert => Ok(NdMessageType::NeighborAdvert),
            Icmpv6Types::Redirect => Ok(NdMessageType::Redirect),
            other => Err(other),
        }
    }
}
