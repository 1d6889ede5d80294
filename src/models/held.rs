use std::net::Ipv6Addr;

use pnet::packet::ipv6::Ipv6Packet;

/// An outbound IPv6 packet waiting for its next-hop to be resolved.
///
/// Held packets own their bytes only: they never reference the cache
/// entry they are queued on, so a dead entry is not kept alive by its queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeldPacket {
    data: Vec<u8>,
}

impl HeldPacket {
    pub fn new(data: Vec<u8>) -> Self {
        HeldPacket { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The source address of the IPv6 header, if the packet has one.
    pub fn source(&self) -> Option<Ipv6Addr> {
        Ipv6Packet::new(&self.data).map(|ip| ip.get_source())
    }

    /// The destination address of the IPv6 header, if the packet has one.
    pub fn destination(&self) -> Option<Ipv6Addr> {
        Ipv6Packet::new(&self.data).map(|ip| ip.get_destination())
    }
}

impl From<Vec<u8>> for HeldPacket {
    fn from(value: Vec<u8>) -> Self {
        HeldPacket::new(value)
    }
}
