use std::net::Ipv6Addr;

use ndisc::builder::{
    build_checksum, build_ipv6, build_lladdr_option, build_neighbor_advert,
    build_neighbor_solicit, build_nonce_option, Packet, ND_HOP_LIMIT,
};
use ndisc::models::{AdvertFlags, LinkAddr, NdMessageType};
use ndisc::options::{lladdr_option_len, nonce_option_len, NONCE};
use ndisc::utilities::solicited_node;
use pnet::packet::icmpv6::ndp::{
    NdpOptionTypes, NeighborAdvertFlags, NeighborAdvertPacket, NeighborSolicitPacket,
};
use pnet::packet::icmpv6::{self, Icmpv6Packet, Icmpv6Types};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::Packet as _;

#[test]
fn test_build_neighbor_solicit() {
    let src_addr: Ipv6Addr = "fe80::1".parse().unwrap();
    let target: Ipv6Addr = "fe80::2".parse().unwrap();
    let dst_addr = solicited_node(target);
    let lladdr = LinkAddr::new(&[0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]).unwrap();
    let nonce = [1, 2, 3, 4, 5, 6];

    let mut buffer = [0u8; 128];
    let options_size = lladdr_option_len(6) + nonce_option_len();
    let mut packet = Packet::new(&mut buffer, NdMessageType::NeighborSolicit, options_size);

    build_ipv6(&mut packet, src_addr, dst_addr);
    build_neighbor_solicit(&mut packet, target);
    let offset = build_lladdr_option(&mut packet, 0, NdpOptionTypes::SourceLLAddr, &lladdr);
    assert_eq!(offset, 8);
    let offset = build_nonce_option(&mut packet, offset, &nonce);
    assert_eq!(offset, 16);
    build_checksum(&mut packet);

    assert_eq!(packet.l3_size(), 40 + 24 + 16);
    assert_eq!(packet.l4_size(), 24 + 16);

    let ip = Ipv6Packet::new(packet.l3()).unwrap();
    assert_eq!(ip.get_version(), 6);
    assert_eq!(ip.get_next_header(), IpNextHeaderProtocols::Icmpv6);
    assert_eq!(ip.get_hop_limit(), ND_HOP_LIMIT);
    assert_eq!(ip.get_payload_length(), 40);
    assert_eq!(ip.get_source(), src_addr);
    assert_eq!(ip.get_destination(), dst_addr);

    let icmp = Icmpv6Packet::new(ip.payload()).unwrap();
    assert_eq!(icmp.get_icmpv6_type(), Icmpv6Types::NeighborSolicit);
    assert_eq!(icmp.get_icmpv6_code().0, 0);
    assert_eq!(
        icmp.get_checksum(),
        icmpv6::checksum(&icmp, &src_addr, &dst_addr)
    );

    let ns = NeighborSolicitPacket::new(ip.payload()).unwrap();
    assert_eq!(ns.get_target_addr(), target);
    let options = &ip.payload()[24..];
    assert_eq!(options[0], NdpOptionTypes::SourceLLAddr.0);
    assert_eq!(options[1], 1);
    assert_eq!(&options[2..8], lladdr.as_bytes());
    assert_eq!(options[8], NONCE.0);
    assert_eq!(options[9], 1);
    assert_eq!(&options[10..16], &nonce);
}

#[test]
fn test_build_neighbor_advert() {
    let src_addr: Ipv6Addr = "2001:db8::1".parse().unwrap();
    let dst_addr: Ipv6Addr = "ff02::1".parse().unwrap();
    let flags = AdvertFlags {
        router: true,
        solicited: false,
        override_: true,
    };

    let mut buffer = [0u8; 128];
    let mut packet = Packet::new(&mut buffer, NdMessageType::NeighborAdvert, 0);
    build_ipv6(&mut packet, src_addr, dst_addr);
    build_neighbor_advert(&mut packet, src_addr, flags);
    build_checksum(&mut packet);

    let ip = Ipv6Packet::new(packet.l3()).unwrap();
    assert_eq!(ip.get_payload_length(), 24);
    let icmp = Icmpv6Packet::new(ip.payload()).unwrap();
    assert_eq!(
        icmp.get_checksum(),
        icmpv6::checksum(&icmp, &src_addr, &dst_addr)
    );

    let na = NeighborAdvertPacket::new(ip.payload()).unwrap();
    assert_eq!(na.get_icmpv6_type(), Icmpv6Types::NeighborAdvert);
    assert_eq!(
        na.get_flags(),
        NeighborAdvertFlags::Router | NeighborAdvertFlags::Override
    );
    assert_eq!(na.get_target_addr(), src_addr);
}

#[test]
fn test_encode_without_lladdr() {
    let target: Ipv6Addr = "fe80::2".parse().unwrap();
    let packet = ndisc::models::Solicitation {
        src_addr: Ipv6Addr::UNSPECIFIED,
        dst_addr: solicited_node(target),
        target,
        source_lladdr: None,
        nonce: None,
    }
    .encode();
    assert_eq!(packet.len(), 40 + 24);
    let ip = Ipv6Packet::new(&packet).unwrap();
    assert_eq!(ip.get_source(), Ipv6Addr::UNSPECIFIED);
}
