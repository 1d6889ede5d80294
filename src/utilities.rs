//! Utilities.
use std::net::Ipv6Addr;

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::models::LinkAddr;

/// All-nodes link-local multicast group.
pub const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// Configure `env_logger` with the given minimum level.
/// `RUST_LOG` still takes precedence for per-module filters.
pub fn configure_logger(level: LevelFilter) {
    env_logger::builder()
        .filter_level(level)
        .format_timestamp_micros()
        .parse_default_env()
        .init();
}

/// Return the solicited-node multicast group of an address (`ff02::1:ffXX:XXXX`).
///
/// ```
/// use std::net::Ipv6Addr;
/// use ndisc::utilities::solicited_node;
///
/// let addr: Ipv6Addr = "fe80::2aa:ff:fe28:9c5a".parse().unwrap();
/// assert_eq!(solicited_node(addr), "ff02::1:ff28:9c5a".parse::<Ipv6Addr>().unwrap());
/// ```
pub fn solicited_node(addr: Ipv6Addr) -> Ipv6Addr {
    let o = addr.octets();
    Ipv6Addr::from([
        0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0xff, o[13], o[14], o[15],
    ])
}

/// Whether the address is a solicited-node multicast group.
pub fn is_solicited_node(addr: Ipv6Addr) -> bool {
    let o = addr.octets();
    o[..12] == [0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01] && o[12] == 0xff
}

/// Whether the address is unicast link-local (`fe80::/10`).
pub fn is_link_local(addr: Ipv6Addr) -> bool {
    addr.segments()[0] & 0xffc0 == 0xfe80
}

/// Map an IPv6 multicast group to its Ethernet group address (`33:33:xx:xx:xx:xx`).
pub fn multicast_lladdr(addr: Ipv6Addr) -> LinkAddr {
    let o = addr.octets();
    LinkAddr::from(pnet::util::MacAddr::new(
        0x33, 0x33, o[12], o[13], o[14], o[15],
    ))
}

/// Build the modified EUI-64 interface identifier of a 6-byte hardware address.
pub fn eui64_interface_id(lladdr: &LinkAddr) -> Option<[u8; 8]> {
    let mac = lladdr.to_mac()?;
    Some([
        mac.0 ^ 0x02,
        mac.1,
        mac.2,
        0xff,
        0xfe,
        mac.3,
        mac.4,
        mac.5,
    ])
}

/// Return the interface identifier (low 64 bits) of an address.
pub fn interface_id(addr: Ipv6Addr) -> [u8; 8] {
    let mut iid = [0u8; 8];
    iid.copy_from_slice(&addr.octets()[8..]);
    iid
}

/// Build the `fe80::/64` link-local address derived from a hardware address.
pub fn link_local_from_lladdr(lladdr: &LinkAddr) -> Option<Ipv6Addr> {
    let iid = eui64_interface_id(lladdr)?;
    let mut octets = [0u8; 16];
    octets[0] = 0xfe;
    octets[1] = 0x80;
    octets[8..].copy_from_slice(&iid);
    Some(Ipv6Addr::from(octets))
}

/// Parse a colon-separated hexadecimal link-layer address (e.g. `aa:bb:cc:00:11:22`).
pub fn parse_lladdr(s: &str) -> Result<LinkAddr> {
    let bytes = s
        .split(':')
        .map(|byte| u8::from_str_radix(byte, 16))
        .collect::<Result<Vec<u8>, _>>()
        .with_context(|| format!("invalid link-layer address: {s}"))?;
    LinkAddr::new(&bytes)
}
