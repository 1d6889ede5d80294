//! Neighbor Discovery tunables.
//!
//! ```
//! use std::time::Duration;
//! use ndisc::config::NdConfig;
//!
//! let config = NdConfig {
//!     dad_count: 3,
//!     retrans_timer: Duration::from_millis(500),
//!     ..Default::default()
//! };
//! println!("{}", config);
//! ```
use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Context-wide configuration. Defaults are the RFC 4861 and RFC 4862 protocol constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NdConfig {
    /// Number of DAD probes sent before an address becomes valid (`DupAddrDetectTransmits`).
    pub dad_count: u32,
    /// Maximum number of DAD probe attempts, including those skipped while the link is down.
    pub dad_max_tries: u32,
    /// Attach a nonce to DAD probes to recognize our own looped-back probes (RFC 7527).
    pub dad_enhanced: bool,
    /// Occupancy of an interface's neighbor cache above which GC runs.
    pub gc_threshold: usize,
    /// Maximum number of entries evicted by one GC pass.
    pub gc_batch: usize,
    /// Hard limit on the number of entries of an interface's neighbor cache.
    pub cache_limit: usize,
    /// Default base reachable time (`BASE_REACHABLE_TIME`).
    pub base_reachable_time: Duration,
    /// Default retransmission timer (`RETRANS_TIMER`).
    pub retrans_timer: Duration,
    /// Time spent in DELAY before probing (`DELAY_FIRST_PROBE_TIME`).
    pub delay_first_probe: Duration,
    /// Lifetime of an unused STALE entry.
    pub gc_timer: Duration,
    /// Upper bound of the random delay before the first DAD probe.
    pub max_rtr_solicitation_delay: Duration,
    /// Interval of the periodic cache sweep.
    pub prune_interval: Duration,
    /// Number of multicast solicitations sent for address resolution (`MAX_MULTICAST_SOLICIT`).
    pub mcast_solicit: u32,
    /// Number of unicast solicitations sent in PROBE (`MAX_UNICAST_SOLICIT`).
    pub ucast_solicit: u32,
    /// Maximum number of packets held per incomplete entry.
    pub max_queue_len: usize,
    /// Maximum number of options accepted in one message.
    pub max_nd_options: usize,
    /// Create a STALE entry when an advertisement names an unknown neighbor.
    pub accept_untracked_na: bool,
    /// Act as a router (sets the router flag of our advertisements).
    pub forwarding: bool,
}

impl Default for NdConfig {
    fn default() -> Self {
        NdConfig {
            dad_count: 1,
            dad_max_tries: 15,
            dad_enhanced: true,
            gc_threshold: 2048,
            gc_batch: 10,
            cache_limit: 8192,
            base_reachable_time: Duration::from_secs(30),
            retrans_timer: Duration::from_secs(1),
            delay_first_probe: Duration::from_secs(5),
            gc_timer: Duration::from_secs(60 * 60 * 24),
            max_rtr_solicitation_delay: Duration::from_secs(1),
            prune_interval: Duration::from_secs(1),
            mcast_solicit: 3,
            ucast_solicit: 3,
            max_queue_len: 1,
            max_nd_options: 10,
            accept_untracked_na: true,
            forwarding: false,
        }
    }
}

impl NdConfig {
    /// Per-interface settings derived from this configuration.
    pub fn interface_settings(&self) -> InterfaceSettings {
        InterfaceSettings {
            base_reachable_time: self.base_reachable_time,
            retrans_timer: self.retrans_timer,
            ..Default::default()
        }
    }
}

impl Display for NdConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "dad_count={}", self.dad_count)?;
        write!(f, " dad_max_tries={}", self.dad_max_tries)?;
        write!(f, " dad_enhanced={}", self.dad_enhanced)?;
        write!(f, " gc_threshold={}", self.gc_threshold)?;
        write!(f, " gc_batch={}", self.gc_batch)?;
        write!(f, " cache_limit={}", self.cache_limit)?;
        write!(f, " base_reachable_time={:?}", self.base_reachable_time)?;
        write!(f, " retrans_timer={:?}", self.retrans_timer)?;
        write!(f, " delay_first_probe={:?}", self.delay_first_probe)?;
        write!(f, " gc_timer={:?}", self.gc_timer)?;
        write!(
            f,
            " max_rtr_solicitation_delay={:?}",
            self.max_rtr_solicitation_delay
        )?;
        write!(f, " prune_interval={:?}", self.prune_interval)?;
        write!(f, " mcast_solicit={}", self.mcast_solicit)?;
        write!(f, " ucast_solicit={}", self.ucast_solicit)?;
        write!(f, " max_queue_len={}", self.max_queue_len)?;
        write!(f, " max_nd_options={}", self.max_nd_options)?;
        write!(f, " accept_untracked_na={}", self.accept_untracked_na)?;
        write!(f, " forwarding={}", self.forwarding)
    }
}

/// Per-interface Neighbor Discovery settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceSettings {
    /// Run Neighbor Unreachability Detection on this interface.
    pub nud_enabled: bool,
    /// Form and configure a link-local address at attach time.
    pub auto_linklocal: bool,
    /// IPv6 is disabled on this interface (set after a hardware address collision).
    pub ifdisabled: bool,
    /// Skip DAD for addresses of this interface.
    pub dad_disabled: bool,
    pub base_reachable_time: Duration,
    pub retrans_timer: Duration,
}

impl Default for InterfaceSettings {
    fn default() -> Self {
        let config = NdConfig::default();
        InterfaceSettings {
            nud_enabled: true,
            auto_linklocal: true,
            ifdisabled: false,
            dad_disabled: false,
            base_reachable_time: config.base_reachable_time,
            retrans_timer: config.retrans_timer,
        }
    }
}

impl Display for InterfaceSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "nud_enabled={}", self.nud_enabled)?;
        write!(f, " auto_linklocal={}", self.auto_linklocal)?;
        write!(f, " ifdisabled={}", self.ifdisabled)?;
        write!(f, " dad_disabled={}", self.dad_disabled)?;
        write!(f, " base_reachable_time={:?}", self.base_reachable_time)?;
        write!(f, " retrans_timer={:?}", self.retrans_timer)
    }
}
