use std::fmt::{Debug, Formatter};
use std::net::Ipv6Addr;

use anyhow::{Context, Result};
use ip_network::Ipv6Network;

/// The on-link prefixes of an interface.
///
/// Each prefix is reference-counted by the addresses that installed it,
/// and leaves the table when its last address is removed.
///
/// ```
/// use ndisc::neighbors::OnLinkPrefixes;
///
/// let mut prefixes = OnLinkPrefixes::default();
/// prefixes.add("2001:db8::1".parse().unwrap(), 64).unwrap();
///
/// assert!(prefixes.contains("2001:db8::42".parse().unwrap()));
/// assert!(!prefixes.contains("2001:db9::42".parse().unwrap()));
/// ```
#[derive(Default)]
pub struct OnLinkPrefixes {
    prefixes: Vec<(Ipv6Network, usize)>,
}

impl OnLinkPrefixes {
    /// Install the prefix of `addr`, returning the network.
    pub fn add(&mut self, addr: Ipv6Addr, prefix_len: u8) -> Result<Ipv6Network> {
        let network = Ipv6Network::new_truncate(addr, prefix_len)
            .with_context(|| format!("invalid prefix {addr}/{prefix_len}"))?;
        match self.prefixes.iter_mut().find(|(n, _)| *n == network) {
            Some((_, refs)) => *refs += 1,
            None => self.prefixes.push((network, 1)),
        }
        Ok(network)
    }

    /// Release the prefix of `addr`, returning the network if it is no longer on-link.
    pub fn remove(&mut self, addr: Ipv6Addr, prefix_len: u8) -> Option<Ipv6Network> {
        let network = Ipv6Network::new_truncate(addr, prefix_len).ok()?;
        let position = self.prefixes.iter().position(|(n, _)| *n == network)?;
        let (_, refs) = &mut self.prefixes[position];
        *refs -= 1;
        if *refs == 0 {
            self.prefixes.remove(position);
            Some(network)
        } else {
            None
        }
    }

    pub fn contains(&self, addr: Ipv6Addr) -> bool {
        self.prefixes.iter().any(|(n, _)| n.contains(addr))
    }

    pub fn all(&self) -> Vec<Ipv6Network> {
        self.prefixes.iter().map(|(n, _)| *n).collect()
    }
}

impl Debug for OnLinkPrefixes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.all().fmt(f)
    }
}
