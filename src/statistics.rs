//! Diagnostic counters.
use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NdStatistics {
    /// Inbound messages dropped because they failed validation.
    pub malformed: u64,
    /// Inbound messages dropped because their hop limit was not 255.
    pub bad_hop_limit: u64,
    /// Inbound packets that were not Neighbor Solicitations or Advertisements.
    pub ignored: u64,
    /// Solicitations dropped because their source was not on the link.
    pub not_neighbor: u64,
    pub ns_received: u64,
    pub na_received: u64,
    pub ns_sent: u64,
    pub na_sent: u64,
    /// Neighbor cache entries evicted by GC.
    pub gc_evictions: u64,
    /// Outbound packets dropped because the hold queue was full.
    pub hold_drops: u64,
    /// Held packets dropped because address resolution failed.
    pub unresolved: u64,
    /// Addresses found duplicated by DAD.
    pub dad_duplicates: u64,
    /// Our own DAD probes seen looped back.
    pub dad_loopbacks: u64,
}

impl Display for NdStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed={}", self.malformed)?;
        write!(f, " bad_hop_limit={}", self.bad_hop_limit)?;
        write!(f, " ignored={}", self.ignored)?;
        write!(f, " not_neighbor={}", self.not_neighbor)?;
        write!(f, " ns_received={}", self.ns_received)?;
        write!(f, " na_received={}", self.na_received)?;
        write!(f, " ns_sent={}", self.ns_sent)?;
        write!(f, " na_sent={}", self.na_sent)?;
        write!(f, " gc_evictions={}", self.gc_evictions)?;
        write!(f, " hold_drops={}", self.hold_drops)?;
        write!(f, " unresolved={}", self.unresolved)?;
        write!(f, " dad_duplicates={}", self.dad_duplicates)?;
        write!(f, " dad_loopbacks={}", self.dad_loopbacks)
    }
}
