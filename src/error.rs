//! Error types of the output path and of the input validation.
use std::net::Ipv6Addr;

use thiserror::Error;

/// Errors returned synchronously to the output path by [`crate::NdContext::resolve`].
///
/// The packet handed to `resolve` is dropped when one of these is returned.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The destination is not a neighbor, or IPv6 is disabled on the interface.
    #[error("network is down")]
    NetDown,
    /// No room for a new cache entry or for another held packet.
    #[error("no buffer space available")]
    NoBuffers,
}

/// Reasons for dropping an inbound Neighbor Discovery message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("bad hop limit {0}")]
    BadHopLimit(u8),
    #[error("bad ICMPv6 checksum")]
    BadChecksum,
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
    #[error("too many options (limit {0})")]
    TooManyOptions(usize),
    #[error("link-layer address option length {actual} (expected {expected})")]
    BadLinkAddrLength { expected: usize, actual: usize },
    /// Not a Neighbor Solicitation or Advertisement.
    #[error("unsupported message (next header {next_header}, type {icmp_type})")]
    Unsupported { next_header: u8, icmp_type: u8 },
    /// A valid solicitation from an address that is not on the link.
    #[error("solicitation from non-neighbor {0}")]
    NotNeighbor(Ipv6Addr),
}

impl InputError {
    /// Whether this drop is accounted as malformed input.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            InputError::BadHopLimit(_)
                | InputError::Unsupported { .. }
                | InputError::NotNeighbor(_)
        )
    }
}
