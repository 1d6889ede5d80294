//! Neighbor Discovery options (RFC 4861 section 4.6, RFC 7527 nonce).
//!
//! Options are parsed in a single bounded pass: every option must have a
//! non-zero length and fit in the remaining buffer, and at most
//! `max_options` options are accepted. Single-occurrence options are stored
//! in a fixed slot table indexed by type (the first occurrence wins), Prefix
//! Information options accumulate in a list, unknown options are skipped.
use log::debug;
use pnet::packet::icmpv6::ndp::{NdpOptionType, NdpOptionTypes};

use crate::error::InputError;
use crate::models::{LinkAddr, Nonce, NONCE_LEN};

/// Nonce option type (RFC 3971).
pub const NONCE: NdpOptionType = NdpOptionType(14);

/// Option lengths are expressed in units of 8 bytes.
pub const OPTION_UNIT: usize = 8;

const SLOT_COUNT: usize = 15;

/// Length in bytes of a link-layer address option carrying `addr_len` bytes.
///
/// ```
/// assert_eq!(ndisc::options::lladdr_option_len(6), 8);
/// assert_eq!(ndisc::options::lladdr_option_len(20), 24);
/// ```
pub fn lladdr_option_len(addr_len: usize) -> usize {
    (addr_len + 2 + OPTION_UNIT - 1) / OPTION_UNIT * OPTION_UNIT
}

/// Length in bytes of the nonce option.
pub fn nonce_option_len() -> usize {
    (NONCE_LEN + 2 + OPTION_UNIT - 1) / OPTION_UNIT * OPTION_UNIT
}

#[derive(Debug, Default)]
pub struct NdOptions<'a> {
    slots: [Option<&'a [u8]>; SLOT_COUNT],
    prefixes: Vec<&'a [u8]>,
    count: usize,
}

impl<'a> NdOptions<'a> {
    pub fn parse(bytes: &'a [u8], max_options: usize) -> Result<Self, InputError> {
        let mut options = NdOptions::default();
        let mut rest = bytes;
        while !rest.is_empty() {
            if rest.len() < 2 {
                return Err(InputError::Truncated("option header"));
            }
            let len = rest[1] as usize * OPTION_UNIT;
            if len == 0 {
                return Err(InputError::Malformed("zero-length option"));
            }
            if len > rest.len() {
                return Err(InputError::Truncated("option"));
            }
            options.count += 1;
            if options.count > max_options {
                return Err(InputError::TooManyOptions(max_options));
            }

            let (option, tail) = rest.split_at(len);
            let kind = NdpOptionType(option[0]);
            match kind {
                NdpOptionTypes::SourceLLAddr
                | NdpOptionTypes::TargetLLAddr
                | NdpOptionTypes::RedirectedHeader
                | NdpOptionTypes::MTU
                | NONCE => {
                    let slot = &mut options.slots[kind.0 as usize];
                    if slot.is_some() {
                        debug!("duplicated nd option type={}", kind.0);
                    } else {
                        *slot = Some(option);
                    }
                }
                NdpOptionTypes::PrefixInformation => options.prefixes.push(option),
                _ => debug!("unknown nd option type={} len={}", kind.0, len),
            }
            rest = tail;
        }
        Ok(options)
    }

    /// The first option of the given type, header included.
    pub fn get(&self, kind: NdpOptionType) -> Option<&'a [u8]> {
        self.slots.get(kind.0 as usize).copied().flatten()
    }

    /// All Prefix Information options, in packet order.
    pub fn prefixes(&self) -> &[&'a [u8]] {
        &self.prefixes
    }

    /// Number of options in the packet, unknown ones included.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn source_lladdr(&self, addr_len: usize) -> Result<Option<LinkAddr>, InputError> {
        self.lladdr(NdpOptionTypes::SourceLLAddr, addr_len)
    }

    pub fn target_lladdr(&self, addr_len: usize) -> Result<Option<LinkAddr>, InputError> {
        self.lladdr(NdpOptionTypes::TargetLLAddr, addr_len)
    }

    fn lladdr(
        &self,
        kind: NdpOptionType,
        addr_len: usize,
    ) -> Result<Option<LinkAddr>, InputError> {
        let Some(option) = self.get(kind) else {
            return Ok(None);
        };
        let expected = lladdr_option_len(addr_len);
        if option.len() != expected {
            return Err(InputError::BadLinkAddrLength {
                expected,
                actual: option.len(),
            });
        }
        LinkAddr::new(&option[2..2 + addr_len])
            .map(Some)
            .map_err(|_| InputError::Malformed("link-layer address"))
    }

    pub fn nonce(&self) -> Result<Option<Nonce>, InputError> {
        let Some(option) = self.get(NONCE) else {
            return Ok(None);
        };
        if option.len() != nonce_option_len() {
            return Err(InputError::Malformed("nonce option length"));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&option[2..2 + NONCE_LEN]);
        Ok(Some(nonce))
    }
}

/// Write a link-layer address option at the start of `buffer`, returning its length.
pub fn write_lladdr_option(buffer: &mut [u8], kind: NdpOptionType, lladdr: &LinkAddr) -> usize {
    let len = lladdr_option_len(lladdr.len());
    buffer[..len].fill(0);
    buffer[0] = kind.0;
    buffer[1] = (len / OPTION_UNIT) as u8;
    buffer[2..2 + lladdr.len()].copy_from_slice(lladdr.as_bytes());
    len
}

/// Write a nonce option at the start of `buffer`, returning its length.
pub fn write_nonce_option(buffer: &mut [u8], nonce: &Nonce) -> usize {
    let len = nonce_option_len();
    buffer[0] = NONCE.0;
    buffer[1] = (len / OPTION_UNIT) as u8;
    buffer[2..2 + NONCE_LEN].copy_from_slice(nonce);
    len
}

#[cfg(test)]
mod tests {
    use pnet::packet::icmpv6::ndp::NdpOptionTypes;

    use crate::error::InputError;
    use crate::models::LinkAddr;
    use crate::options::{write_lladdr_option, write_nonce_option, NdOptions};

    const MAC: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];

    #[test]
    fn test_parse_lladdr_and_nonce() {
        let mut buffer = [0u8; 16];
        let n = write_lladdr_option(
            &mut buffer,
            NdpOptionTypes::SourceLLAddr,
            &LinkAddr::new(&MAC).unwrap(),
        );
        write_nonce_option(&mut buffer[n..], &[1, 2, 3, 4, 5, 6]);

        let options = NdOptions::parse(&buffer, 10).unwrap();
        assert_eq!(options.count(), 2);
        assert_eq!(
            options.source_lladdr(6).unwrap(),
            Some(LinkAddr::new(&MAC).unwrap())
        );
        assert_eq!(options.target_lladdr(6).unwrap(), None);
        assert_eq!(options.nonce().unwrap(), Some([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let buffer = [
            1, 1, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, //
            1, 1, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb,
        ];
        let options = NdOptions::parse(&buffer, 10).unwrap();
        assert_eq!(
            options.source_lladdr(6).unwrap(),
            Some(LinkAddr::new(&[0xaa; 6]).unwrap())
        );
    }

    #[test]
    fn test_prefixes_accumulate() {
        let mut buffer = vec![0u8; 64];
        buffer[0] = 3;
        buffer[1] = 4;
        buffer[32] = 3;
        buffer[33] = 4;
        let options = NdOptions::parse(&buffer, 10).unwrap();
        assert_eq!(options.prefixes().len(), 2);
    }

    #[test]
    fn test_zero_length_option() {
        let buffer = [1, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            NdOptions::parse(&buffer, 10).unwrap_err(),
            InputError::Malformed("zero-length option")
        );
    }

    #[test]
    fn test_option_overruns_buffer() {
        let buffer = [1, 2, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            NdOptions::parse(&buffer, 10).unwrap_err(),
            InputError::Truncated("option")
        );
        assert!(NdOptions::parse(&[1], 10).is_err());
    }

    #[test]
    fn test_option_count_cap() {
        // Three unknown options, limit of two.
        let buffer = [200u8, 1, 0, 0, 0, 0, 0, 0].repeat(3);
        assert_eq!(
            NdOptions::parse(&buffer, 2).unwrap_err(),
            InputError::TooManyOptions(2)
        );
        assert_eq!(NdOptions::parse(&buffer, 3).unwrap().count(), 3);
    }

    #[test]
    fn test_lladdr_length_must_match_link() {
        // 16 bytes option for a 6 bytes link-layer address.
        let mut buffer = [0u8; 16];
        buffer[0] = 2;
        buffer[1] = 2;
        let options = NdOptions::parse(&buffer, 10).unwrap();
        assert_eq!(
            options.target_lladdr(6).unwrap_err(),
            InputError::BadLinkAddrLength {
                expected: 8,
                actual: 16
            }
        );
    }

    #[test]
    fn test_bad_nonce_length() {
        let mut buffer = [0u8; 16];
        buffer[0] = 14;
        buffer[1] = 2;
        let options = NdOptions::parse(&buffer, 10).unwrap();
        assert!(options.nonce().is_err());
    }
}
