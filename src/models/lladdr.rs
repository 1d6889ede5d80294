use std::fmt::{Debug, Display, Formatter};

use anyhow::{bail, Result};
use pnet::util::MacAddr;

/// Largest link-layer address we can store (InfiniBand).
pub const MAX_ADDR_LEN: usize = 20;

/// A link-layer (hardware) address of up to [`MAX_ADDR_LEN`] bytes.
///
/// ```
/// use ndisc::models::LinkAddr;
/// use pnet::util::MacAddr;
///
/// let lladdr = LinkAddr::from(MacAddr::new(0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22));
/// assert_eq!(lladdr.len(), 6);
/// assert_eq!(lladdr.to_string(), "aa:bb:cc:00:11:22");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct LinkAddr {
    len: u8,
    bytes: [u8; MAX_ADDR_LEN],
}

impl LinkAddr {
    /// The empty address, used on links without link-layer addressing.
    pub const EMPTY: LinkAddr = LinkAddr {
        len: 0,
        bytes: [0; MAX_ADDR_LEN],
    };

    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_ADDR_LEN {
            bail!("link-layer address too long ({} bytes)", bytes.len());
        }
        let mut lladdr = Self::EMPTY;
        lladdr.len = bytes.len() as u8;
        lladdr.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(lladdr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The address as a MAC address, if it has 6 bytes.
    pub fn to_mac(&self) -> Option<MacAddr> {
        match self.as_bytes() {
            [a, b, c, d, e, f] => Some(MacAddr::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }
}

impl From<MacAddr> for LinkAddr {
    fn from(value: MacAddr) -> Self {
        let mut lladdr = Self::EMPTY;
        lladdr.len = 6;
        lladdr.bytes[..6].copy_from_slice(&[value.0, value.1, value.2, value.3, value.4, value.5]);
        lladdr
    }
}

impl Display for LinkAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for LinkAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinkAddr({})", self)
    }
}

#[cfg(test)]
mod tests {
    use pnet::util::MacAddr;

    use crate::models::{LinkAddr, MAX_ADDR_LEN};

    #[test]
    fn test_mac_round_trip() {
        let mac = MacAddr::new(0x02, 0x00, 0x5e, 0x10, 0x20, 0x30);
        let lladdr = LinkAddr::from(mac);
        assert_eq!(lladdr.to_mac(), Some(mac));
        assert_eq!(lladdr, LinkAddr::new(&[0x02, 0x00, 0x5e, 0x10, 0x20, 0x30]).unwrap());
    }

    #[test]
    fn test_lengths() {
        assert!(LinkAddr::new(&[0u8; MAX_ADDR_LEN + 1]).is_err());
        let ib = LinkAddr::new(&[1u8; MAX_ADDR_LEN]).unwrap();
        assert_eq!(ib.len(), MAX_ADDR_LEN);
        assert_eq!(ib.to_mac(), None);
        assert_eq!(LinkAddr::EMPTY.to_string(), "(none)");
    }

    #[test]
    fn test_same_bytes_different_length_differ() {
        let short = LinkAddr::new(&[0xaa, 0xbb]).unwrap();
        let long = LinkAddr::new(&[0xaa, 0xbb, 0x00]).unwrap();
        assert_ne!(short, long);
    }
}
