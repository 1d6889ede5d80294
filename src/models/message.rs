use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

use pnet::packet::icmpv6::ndp::NeighborAdvertFlags;

use crate::models::LinkAddr;
use crate::options::NdOptions;

/// Length of the RFC 7527 nonce carried in DAD probes.
pub const NONCE_LEN: usize = 6;

/// A DAD nonce.
pub type Nonce = [u8; NONCE_LEN];

/// Flags of a Neighbor Advertisement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertFlags {
    pub router: bool,
    pub solicited: bool,
    pub override_: bool,
}

impl From<u8> for AdvertFlags {
    fn from(value: u8) -> Self {
        AdvertFlags {
            router: value & NeighborAdvertFlags::Router != 0,
            solicited: value & NeighborAdvertFlags::Solicited != 0,
            override_: value & NeighborAdvertFlags::Override != 0,
        }
    }
}

impl From<AdvertFlags> for u8 {
    fn from(value: AdvertFlags) -> Self {
        let mut flags = 0;
        if value.router {
            flags |= NeighborAdvertFlags::Router;
        }
        if value.solicited {
            flags |= NeighborAdvertFlags::Solicited;
        }
        if value.override_ {
            flags |= NeighborAdvertFlags::Override;
        }
        flags
    }
}

impl Display for AdvertFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "router={} solicited={} override={}",
            self.router, self.solicited, self.override_
        )
    }
}

/// An outgoing Neighbor Solicitation.
#[derive(Clone, Debug, PartialEq)]
pub struct Solicitation {
    /// Unspecified for DAD probes.
    pub src_addr: Ipv6Addr,
    /// Solicited-node multicast group of the target, or the target itself for NUD probes.
    pub dst_addr: Ipv6Addr,
    pub target: Ipv6Addr,
    /// Source link-layer address option, omitted for DAD probes.
    pub source_lladdr: Option<LinkAddr>,
    /// Nonce option, only for DAD probes.
    pub nonce: Option<Nonce>,
}

impl Display for Solicitation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ns src={} dst={} target={}",
            self.src_addr, self.dst_addr, self.target
        )?;
        if let Some(lladdr) = self.source_lladdr {
            write!(f, " slla={}", lladdr)?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, " nonce={}", hex::encode(nonce))?;
        }
        Ok(())
    }
}

/// An outgoing Neighbor Advertisement.
#[derive(Clone, Debug, PartialEq)]
pub struct Advertisement {
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub target: Ipv6Addr,
    pub flags: AdvertFlags,
    /// Target link-layer address option.
    pub target_lladdr: Option<LinkAddr>,
}

impl Display for Advertisement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "na src={} dst={} target={} {}",
            self.src_addr, self.dst_addr, self.target, self.flags
        )?;
        if let Some(lladdr) = self.target_lladdr {
            write!(f, " tlla={}", lladdr)?;
        }
        Ok(())
    }
}

/// Body of a validated Neighbor Discovery message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NdBody {
    Solicit,
    Advert(AdvertFlags),
}

/// A validated inbound Neighbor Solicitation or Advertisement.
///
/// The options borrow from the packet buffer.
#[derive(Debug)]
pub struct NdMessage<'a> {
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub target: Ipv6Addr,
    pub body: NdBody,
    pub options: NdOptions<'a>,
}

impl NdMessage<'_> {
    pub fn is_dad(&self) -> bool {
        self.body == NdBody::Solicit && self.src_addr.is_unspecified()
    }
}

impl Display for NdMessage<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.body {
            NdBody::Solicit => write!(f, "ns")?,
            NdBody::Advert(flags) => write!(f, "na {}", flags)?,
        }
        write!(
            f,
            " src={} dst={} target={}",
            self.src_addr, self.dst_addr, self.target
        )
    }
}
