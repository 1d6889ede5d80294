use pnet::packet::icmpv6::ndp::{NeighborAdvertPacket, NeighborSolicitPacket};
use pnet::packet::ipv6::Ipv6Packet;

use crate::models::NdMessageType;

/// A Packet holds pointers to the IPv6 header, the ICMPv6 message and its options over a buffer.
///
/// ```
/// use ndisc::builder::Packet;
/// use ndisc::models::NdMessageType;
///
/// let mut buffer = [0u8; 128];
/// let packet = Packet::new(&mut buffer, NdMessageType::NeighborSolicit, 8);
///
/// assert_eq!(packet.l3_size(), 40 + 24 + 8);
/// assert_eq!(packet.l4_size(), 24 + 8);
/// ```
pub struct Packet<'a> {
    buffer: &'a mut [u8],
    message_type: NdMessageType,
    l3_start: usize,
    l4_start: usize,
    options_start: usize,
    options_end: usize,
}

impl Packet<'_> {
    /// Build a new packet over an existing buffer.
    ///
    /// Panics if the buffer is too small to hold the headers and options.
    pub fn new(
        buffer: &'_ mut [u8],
        message_type: NdMessageType,
        options_size: usize,
    ) -> Packet<'_> {
        let l4_header_size = match message_type {
            NdMessageType::NeighborSolicit => NeighborSolicitPacket::minimum_packet_size(),
            NdMessageType::NeighborAdvert => NeighborAdvertPacket::minimum_packet_size(),
            other => unimplemented!("cannot build {} messages", other),
        };

        let l3_start = 0;
        let l4_start = l3_start + Ipv6Packet::minimum_packet_size();
        let options_start = l4_start + l4_header_size;
        let options_end = options_start + options_size;
        buffer[l3_start..options_end].fill(0);

        Packet {
            buffer,
            message_type,
            l3_start,
            l4_start,
            options_start,
            options_end,
        }
    }

    /// A slice from the start of the IPv6 header to the end of the options.
    pub fn l3(&self) -> &[u8] {
        &self.buffer[self.l3_start..self.options_end]
    }

    /// A slice from the start of the ICMPv6 header to the end of the options.
    pub fn l4(&self) -> &[u8] {
        &self.buffer[self.l4_start..self.options_end]
    }

    /// A slice over the options.
    pub fn options(&self) -> &[u8] {
        &self.buffer[self.options_start..self.options_end]
    }

    pub fn l3_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.l3_start..self.options_end]
    }

    pub fn l4_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.l4_start..self.options_end]
    }

    pub fn options_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.options_start..self.options_end]
    }

    pub fn message_type(&self) -> NdMessageType {
        self.message_type
    }

    /// The size of the packet from the start of the IPv6 header to the end of the options.
    pub fn l3_size(&self) -> u16 {
        (self.options_end - self.l3_start) as u16
    }

    /// The size of the ICMPv6 message, options included.
    pub fn l4_size(&self) -> u16 {
        (self.options_end - self.l4_start) as u16
    }
}
