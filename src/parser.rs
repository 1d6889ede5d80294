//! Function for parsing and validating inbound Neighbor Solicitations and Advertisements.
//!
//! Validation follows RFC 4861 sections 7.1.1 and 7.1.2. Every check that
//! does not need interface state is done here; the link-layer address
//! option lengths are checked later against the receiving interface.
use log::trace;
use pnet::packet::icmpv6::ndp::{NdpOptionTypes, NeighborAdvertPacket, NeighborSolicitPacket};
use pnet::packet::icmpv6::{self, Icmpv6Packet, Icmpv6Types};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::Packet as _;

use crate::builder::ND_HOP_LIMIT;
use crate::error::InputError;
use crate::models::{AdvertFlags, NdBody, NdMessage};
use crate::options::NdOptions;
use crate::utilities::is_solicited_node;

/// Size of the fixed part of both NS and NA messages.
const ND_HEADER_SIZE: usize = 24;

/// Parse an IPv6 packet into a Neighbor Discovery message.
pub fn parse(bytes: &[u8], max_options: usize) -> Result<NdMessage<'_>, InputError> {
    let ip = Ipv6Packet::new(bytes).ok_or(InputError::Truncated("ipv6 header"))?;
    let header_size = Ipv6Packet::minimum_packet_size();

    let next_header = ip.get_next_header();
    if next_header != IpNextHeaderProtocols::Icmpv6 {
        return Err(InputError::Unsupported {
            next_header: next_header.0,
            icmp_type: 0,
        });
    }

    let payload_length = ip.get_payload_length() as usize;
    let icmp_bytes = bytes
        .get(header_size..header_size + payload_length)
        .ok_or(InputError::Truncated("ipv6 payload"))?;
    let icmp = Icmpv6Packet::new(icmp_bytes).ok_or(InputError::Truncated("icmpv6 header"))?;

    let icmp_type = icmp.get_icmpv6_type();
    if icmp_type != Icmpv6Types::NeighborSolicit && icmp_type != Icmpv6Types::NeighborAdvert {
        return Err(InputError::Unsupported {
            next_header: next_header.0,
            icmp_type: icmp_type.0,
        });
    }

    let src_addr = ip.get_source();
    let dst_addr = ip.get_destination();

    if ip.get_hop_limit() != ND_HOP_LIMIT {
        return Err(InputError::BadHopLimit(ip.get_hop_limit()));
    }
    if icmp.get_checksum() != icmpv6::checksum(&icmp, &src_addr, &dst_addr) {
        return Err(InputError::BadChecksum);
    }
    if icmp.get_icmpv6_code().0 != 0 {
        return Err(InputError::Malformed("icmpv6 code"));
    }
    if icmp.packet().len() < ND_HEADER_SIZE {
        return Err(InputError::Truncated("nd message"));
    }

    let (target, body) = if icmp_type == Icmpv6Types::NeighborSolicit {
        let ns = NeighborSolicitPacket::new(icmp_bytes).ok_or(InputError::Truncated("ns"))?;
        (ns.get_target_addr(), NdBody::Solicit)
    } else {
        let na = NeighborAdvertPacket::new(icmp_bytes).ok_or(InputError::Truncated("na"))?;
        (
            na.get_target_addr(),
            NdBody::Advert(AdvertFlags::from(na.get_flags())),
        )
    };

    if target.is_multicast() {
        return Err(InputError::Malformed("multicast target"));
    }

    match body {
        NdBody::Solicit if src_addr.is_unspecified() && !is_solicited_node(dst_addr) => {
            return Err(InputError::Malformed("dad probe not sent to solicited-node group"));
        }
        NdBody::Advert(flags) if flags.solicited && dst_addr.is_multicast() => {
            return Err(InputError::Malformed("solicited advertisement to multicast"));
        }
        _ => {}
    }

    let options = NdOptions::parse(&icmp_bytes[ND_HEADER_SIZE..], max_options)?;

    let message = NdMessage {
        src_addr,
        dst_addr,
        target,
        body,
        options,
    };

    // RFC 4861 7.1.1: no source link-layer address when the source is unspecified.
    if message.is_dad() && message.options.get(NdpOptionTypes::SourceLLAddr).is_some() {
        return Err(InputError::Malformed("source lladdr in dad probe"));
    }

    trace!("{}", message);
    Ok(message)
}
