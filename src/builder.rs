//! Functions for building Neighbor Discovery packets.
//!
//! These functions are meant to be called in order: IPv6 header, ICMPv6 message,
//! options, and finally the checksum.
//!
//! # Examples
//!
//! ```
//! use std::net::Ipv6Addr;
//! use ndisc::builder::{build_checksum, build_ipv6, build_neighbor_solicit, Packet};
//! use ndisc::models::NdMessageType;
//!
//! let target: Ipv6Addr = "fe80::1".parse().unwrap();
//! let mut buffer = [0u8; 128];
//! let mut packet = Packet::new(&mut buffer, NdMessageType::NeighborSolicit, 0);
//!
//! build_ipv6(&mut packet, Ipv6Addr::UNSPECIFIED, "ff02::1:ff00:1".parse().unwrap());
//! build_neighbor_solicit(&mut packet, target);
//! build_checksum(&mut packet);
//!
//! println!("{:?}", packet.l3());
//! ```
mod builders;
mod packet;

pub use builders::*;
pub use packet::*;

use pnet::packet::icmpv6::ndp::NdpOptionTypes;

use crate::models::{Advertisement, NdMessageType, Solicitation};
use crate::options::{lladdr_option_len, nonce_option_len};

/// Upper bound on the size of the messages built by this crate.
pub const MAX_ND_PACKET_SIZE: usize = 128;

impl Solicitation {
    /// Encode the solicitation as an IPv6 packet.
    pub fn encode(&self) -> Vec<u8> {
        let options_size = self
            .source_lladdr
            .map_or(0, |lladdr| lladdr_option_len(lladdr.len()))
            + self.nonce.map_or(0, |_| nonce_option_len());

        let mut buffer = [0u8; MAX_ND_PACKET_SIZE];
        let mut packet = Packet::new(&mut buffer, NdMessageType::NeighborSolicit, options_size);
        build_ipv6(&mut packet, self.src_addr, self.dst_addr);
        build_neighbor_solicit(&mut packet, self.target);
        let mut offset = 0;
        if let Some(lladdr) = &self.source_lladdr {
            offset = build_lladdr_option(&mut packet, offset, NdpOptionTypes::SourceLLAddr, lladdr);
        }
        if let Some(nonce) = &self.nonce {
            build_nonce_option(&mut packet, offset, nonce);
        }
        build_checksum(&mut packet);
        packet.l3().to_vec()
    }
}

impl Advertisement {
    /// Encode the advertisement as an IPv6 packet.
    pub fn encode(&self) -> Vec<u8> {
        let options_size = self
            .target_lladdr
            .map_or(0, |lladdr| lladdr_option_len(lladdr.len()));

        let mut buffer = [0u8; MAX_ND_PACKET_SIZE];
        let mut packet = Packet::new(&mut buffer, NdMessageType::NeighborAdvert, options_size);
        build_ipv6(&mut packet, self.src_addr, self.dst_addr);
        build_neighbor_advert(&mut packet, self.target, self.flags);
        if let Some(lladdr) = &self.target_lladdr {
            build_lladdr_option(&mut packet, 0, NdpOptionTypes::TargetLLAddr, lladdr);
        }
        build_checksum(&mut packet);
        packet.l3().to_vec()
    }
}
