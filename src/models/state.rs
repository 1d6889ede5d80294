use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::AdvertFlags;

/// Reachability state of a neighbor cache entry (RFC 4861 section 7.3.2).
#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum NudState {
    /// Address resolution is in progress, the link-layer address is not known yet.
    Incomplete,
    /// The neighbor was recently confirmed reachable.
    Reachable,
    /// Reachability is unknown until traffic is sent to the neighbor.
    Stale,
    /// Traffic was sent to a stale neighbor, waiting for upper-layer confirmation.
    Delay,
    /// Unicast solicitations are being sent to confirm reachability.
    Probe,
}

impl NudState {
    /// States in which the cached link-layer address can be used for transmission.
    pub fn is_usable(&self) -> bool {
        !matches!(self, NudState::Incomplete)
    }
}

/// The protocol event that supplied (or omitted) a neighbor's link-layer address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    NeighborSolicit,
    NeighborAdvert(AdvertFlags),
    RouterSolicit,
    RouterAdvert,
    /// A Redirect naming the neighbor; `router` is set when the target is a better first hop.
    Redirect { router: bool },
}

impl InputKind {
    /// Whether the event confirms reachability (a solicited advertisement).
    pub fn is_solicited(&self) -> bool {
        matches!(self, InputKind::NeighborAdvert(flags) if flags.solicited)
    }

    /// Whether the event may replace a cached link-layer address.
    /// Only advertisements can be non-authoritative.
    pub fn is_override(&self) -> bool {
        match self {
            InputKind::NeighborAdvert(flags) => flags.override_,
            _ => true,
        }
    }
}
