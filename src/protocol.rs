//! Neighbor Solicitation and Advertisement handlers (RFC 4861 section 7.2).
use std::net::Ipv6Addr;

use log::{debug, trace, warn};

use crate::context::NdContext;
use crate::error::InputError;
use crate::interface::{Interface, InterfaceAddress};
use crate::models::{
    AdvertFlags, Advertisement, InputKind, LinkAddr, NdBody, NdMessage, Solicitation,
};
use crate::parser::parse;
use crate::utilities::{solicited_node, ALL_NODES};

impl NdContext {
    /// Process an inbound IPv6 packet received on `ifp`.
    ///
    /// Packets other than Neighbor Solicitations and Advertisements are ignored.
    /// Invalid messages are dropped and counted, they never modify any state.
    pub fn input(&self, ifp: &Interface, packet: &[u8]) {
        if ifp.is_disabled() {
            trace!("{}: IPv6 disabled, dropping input", ifp.name());
            return;
        }
        let message = match parse(packet, self.config().max_nd_options) {
            Ok(message) => message,
            Err(error) => {
                self.count_drop(ifp, &error);
                return;
            }
        };
        let result = match message.body {
            NdBody::Solicit => {
                self.statistics().lock().unwrap().ns_received += 1;
                self.ns_input(ifp, &message)
            }
            NdBody::Advert(flags) => {
                self.statistics().lock().unwrap().na_received += 1;
                self.na_input(ifp, &message, flags)
            }
        };
        if let Err(error) = result {
            self.count_drop(ifp, &error);
        }
    }

    fn count_drop(&self, ifp: &Interface, error: &InputError) {
        let mut statistics = self.statistics().lock().unwrap();
        match error {
            InputError::BadHopLimit(_) => statistics.bad_hop_limit += 1,
            InputError::Unsupported { .. } => statistics.ignored += 1,
            InputError::NotNeighbor(_) => statistics.not_neighbor += 1,
            _ => statistics.malformed += 1,
        }
        if error.is_malformed() {
            debug!("{}: dropped nd message: {}", ifp.name(), error);
        } else {
            trace!("{}: dropped packet: {}", ifp.name(), error);
        }
    }

    fn ns_input(&self, ifp: &Interface, message: &NdMessage) -> Result<(), InputError> {
        let src_addr = message.src_addr;
        let target = message.target;
        let dad = message.is_dad();

        if !dad && !self.is_neighbor(ifp, src_addr) {
            return Err(InputError::NotNeighbor(src_addr));
        }
        let lladdr = message.options.source_lladdr(ifp.addr_len())?;
        let nonce = message.options.nonce()?;

        let Some(ia) = ifp.find_address(target) else {
            trace!("{}: ns for {} which is not ours", ifp.name(), target);
            return Ok(());
        };
        if src_addr == target {
            warn!(
                "{}: duplicate IPv6 address {}: ns from our own address",
                ifp.name(),
                target
            );
            return Ok(());
        }
        if ia.is_tentative() {
            // A tentative address is only defended by DAD, not answered for.
            if dad {
                self.dad_ns_input(ifp, &ia, nonce);
            }
            return Ok(());
        }
        if !ia.is_usable() {
            return Ok(());
        }

        let include_tlla = message.dst_addr.is_multicast();
        let flags = AdvertFlags {
            router: self.config().forwarding,
            solicited: false,
            override_: !ia.is_anycast(),
        };
        if dad {
            // Another node probes for an address we own: tell everyone.
            self.na_output(ifp, &ia, ALL_NODES, flags, true);
            return Ok(());
        }

        self.on_input(ifp, src_addr, lladdr, InputKind::NeighborSolicit);
        self.na_output(
            ifp,
            &ia,
            src_addr,
            AdvertFlags {
                solicited: true,
                ..flags
            },
            include_tlla,
        );
        Ok(())
    }

    fn na_input(
        &self,
        ifp: &Interface,
        message: &NdMessage,
        flags: AdvertFlags,
    ) -> Result<(), InputError> {
        let target = message.target;
        let lladdr = message.options.target_lladdr(ifp.addr_len())?;

        if let Some(ia) = ifp.find_address(target) {
            if lladdr.is_some() && lladdr == ifp.lladdr() {
                trace!("{}: our own na for {} looped back", ifp.name(), target);
                return Ok(());
            }
            if ia.is_tentative() {
                self.dad_na_input(ifp, &ia, lladdr);
                return Ok(());
            }
            warn!(
                "{}: duplicate IPv6 address {}: na from {}",
                ifp.name(),
                target,
                lladdr.unwrap_or(LinkAddr::EMPTY)
            );
            return Ok(());
        }

        if ifp.cache().lookup(target).is_none()
            && (!self.config().accept_untracked_na || !self.is_neighbor(ifp, target))
        {
            trace!("{}: na for untracked neighbor {}", ifp.name(), target);
            return Ok(());
        }
        self.on_input(ifp, target, lladdr, InputKind::NeighborAdvert(flags));
        Ok(())
    }

    /// Send an address resolution or unreachability probe for `target`.
    ///
    /// Multicast to the solicited-node group unless `unicast` holds the cached
    /// link-layer address of a neighbor being probed.
    pub(crate) fn ns_output(
        &self,
        ifp: &Interface,
        target: Ipv6Addr,
        unicast: Option<LinkAddr>,
        source_hint: Option<Ipv6Addr>,
    ) {
        let Some(src_addr) = ifp.select_source(target, source_hint) else {
            debug!("{}: no source address to solicit {}", ifp.name(), target);
            return;
        };
        let solicitation = Solicitation {
            src_addr,
            dst_addr: if unicast.is_some() {
                target
            } else {
                solicited_node(target)
            },
            target,
            source_lladdr: ifp.lladdr(),
            nonce: None,
        };
        self.send_solicitation_to(ifp, &solicitation, unicast);
    }

    /// Send a solicitation to its multicast destination.
    pub(crate) fn send_solicitation(&self, ifp: &Interface, solicitation: &Solicitation) {
        self.send_solicitation_to(ifp, solicitation, None);
    }

    fn send_solicitation_to(
        &self,
        ifp: &Interface,
        solicitation: &Solicitation,
        lladdr: Option<LinkAddr>,
    ) {
        let dst = lladdr.unwrap_or_else(|| self.link_destination(ifp, solicitation.dst_addr));
        debug!("{}: send {}", ifp.name(), solicitation);
        self.statistics().lock().unwrap().ns_sent += 1;
        self.transmit(ifp, dst, &solicitation.encode());
    }

    /// Advertise one of our addresses to `dst`.
    ///
    /// The target link-layer address is only included when requested, and
    /// the override flag is never set without it.
    fn na_output(
        &self,
        ifp: &Interface,
        ia: &InterfaceAddress,
        dst: Ipv6Addr,
        mut flags: AdvertFlags,
        include_tlla: bool,
    ) {
        let target_lladdr = if include_tlla { ifp.lladdr() } else { None };
        if target_lladdr.is_none() {
            flags.override_ = false;
        }
        // Anycast addresses must not be used as a source.
        let src_addr = if ia.is_anycast() {
            match ifp.select_source(dst, None) {
                Some(src_addr) => src_addr,
                None => {
                    debug!("{}: no source address to advertise {}", ifp.name(), ia.addr());
                    return;
                }
            }
        } else {
            ia.addr()
        };
        let advertisement = Advertisement {
            src_addr,
            dst_addr: dst,
            target: ia.addr(),
            flags,
            target_lladdr,
        };
        debug!("{}: send {}", ifp.name(), advertisement);
        self.statistics().lock().unwrap().na_sent += 1;
        if let Err(error) = self.output(ifp, dst, advertisement.encode()) {
            debug!("{}: cannot send na to {}: {}", ifp.name(), dst, error);
        }
    }

    /// Hand a frame to the link.
    pub(crate) fn transmit(&self, ifp: &Interface, dst: LinkAddr, packet: &[u8]) {
        if let Err(error) = self.hooks().output.transmit(ifp, dst, packet) {
            warn!("{}: transmit to {} failed: {:?}", ifp.name(), dst, error);
        }
    }
}
