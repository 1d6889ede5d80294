use std::net::Ipv6Addr;

use pnet::packet::icmpv6::ndp::{
    Icmpv6Codes, MutableNeighborAdvertPacket, MutableNeighborSolicitPacket, NdpOptionType,
};
use pnet::packet::icmpv6::{self, Icmpv6Packet, Icmpv6Types, MutableIcmpv6Packet};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::{Ipv6Packet, MutableIpv6Packet};

use crate::builder::Packet;
use crate::models::{AdvertFlags, LinkAddr, NdMessageType, Nonce};
use crate::options::{write_lladdr_option, write_nonce_option};

/// Hop limit of every Neighbor Discovery message.
/// Receivers drop messages with any other value, since they may have crossed a router.
pub const ND_HOP_LIMIT: u8 = 255;

/// Build the IPv6 header.
pub fn build_ipv6(packet: &mut Packet, src_addr: Ipv6Addr, dst_addr: Ipv6Addr) {
    let payload_length = packet.l4_size();
    let mut ip = MutableIpv6Packet::new(packet.l3_mut()).unwrap();
    ip.set_version(6);
    ip.set_traffic_class(0);
    ip.set_flow_label(0);
    ip.set_next_header(IpNextHeaderProtocols::Icmpv6);
    ip.set_source(src_addr);
    ip.set_destination(dst_addr);
    ip.set_hop_limit(ND_HOP_LIMIT);
    ip.set_payload_length(payload_length);
}

/// Build the Neighbor Solicitation header.
pub fn build_neighbor_solicit(packet: &mut Packet, target: Ipv6Addr) {
    debug_assert_eq!(packet.message_type(), NdMessageType::NeighborSolicit);
    let mut ns = MutableNeighborSolicitPacket::new(packet.l4_mut()).unwrap();
    ns.set_icmpv6_type(Icmpv6Types::NeighborSolicit);
    ns.set_icmpv6_code(Icmpv6Codes::NoCode);
    ns.set_reserved(0);
    ns.set_target_addr(target);
}

/// Build the Neighbor Advertisement header.
pub fn build_neighbor_advert(packet: &mut Packet, target: Ipv6Addr, flags: AdvertFlags) {
    debug_assert_eq!(packet.message_type(), NdMessageType::NeighborAdvert);
    let mut na = MutableNeighborAdvertPacket::new(packet.l4_mut()).unwrap();
    na.set_icmpv6_type(Icmpv6Types::NeighborAdvert);
    na.set_icmpv6_code(Icmpv6Codes::NoCode);
    na.set_flags(flags.into());
    na.set_reserved(0);
    na.set_target_addr(target);
}

/// Write a link-layer address option at `offset` in the options area, returning the next offset.
pub fn build_lladdr_option(
    packet: &mut Packet,
    offset: usize,
    kind: NdpOptionType,
    lladdr: &LinkAddr,
) -> usize {
    offset + write_lladdr_option(&mut packet.options_mut()[offset..], kind, lladdr)
}

/// Write a nonce option at `offset` in the options area, returning the next offset.
pub fn build_nonce_option(packet: &mut Packet, offset: usize, nonce: &Nonce) -> usize {
    offset + write_nonce_option(&mut packet.options_mut()[offset..], nonce)
}

/// Compute the ICMPv6 checksum over the pseudo-header, the message and its options.
///
/// Must be called last, once every other field is set.
pub fn build_checksum(packet: &mut Packet) {
    let (src_addr, dst_addr) = {
        let ip = Ipv6Packet::new(packet.l3()).unwrap();
        (ip.get_source(), ip.get_destination())
    };
    let checksum = {
        let icmp = Icmpv6Packet::new(packet.l4()).unwrap();
        icmpv6::checksum(&icmp, &src_addr, &dst_addr)
    };
    MutableIcmpv6Packet::new(packet.l4_mut())
        .unwrap()
        .set_checksum(checksum);
}
