#![allow(dead_code)]
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ndisc::config::NdConfig;
use ndisc::hooks::{AddressEvents, Hooks, LinkOutput, RouterList};
use ndisc::interface::{Interface, InterfaceAddress};
use ndisc::models::{
    AdvertFlags, Advertisement, HeldPacket, LinkAddr, LinkType, NdMessage, Nonce, Solicitation,
};
use ndisc::parser::parse;
use ndisc::utilities::solicited_node;
use ndisc::{AddressOptions, NdContext};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::MutableIpv6Packet;

pub const LOCAL_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x0a];

pub fn addr(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

pub fn mac(byte: u8) -> LinkAddr {
    LinkAddr::new(&[byte; 6]).unwrap()
}

pub fn local_mac() -> LinkAddr {
    LinkAddr::new(&LOCAL_MAC).unwrap()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Activated(Ipv6Addr),
    Duplicated(Ipv6Addr),
    Disabled(u32),
    RouterFlagCleared(Ipv6Addr),
    FlushRoutes(Ipv6Addr),
    RouterRemoved(Ipv6Addr),
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub lladdr: LinkAddr,
    pub packet: Vec<u8>,
}

impl Frame {
    /// The frame as a Neighbor Discovery message, if it is one.
    pub fn message(&self) -> Option<NdMessage<'_>> {
        parse(&self.packet, 10).ok()
    }
}

/// Records everything the engine hands to its collaborators.
#[derive(Default)]
pub struct Recorder {
    frames: Mutex<Vec<Frame>>,
    unresolved: Mutex<Vec<(Ipv6Addr, Vec<HeldPacket>)>>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    /// Frames that are Neighbor Solicitations.
    pub fn solicitations(&self) -> Vec<Frame> {
        self.frames()
            .into_iter()
            .filter(|frame| {
                frame
                    .message()
                    .map_or(false, |message| message.body == ndisc::models::NdBody::Solicit)
            })
            .collect()
    }

    /// Frames that are Neighbor Advertisements.
    pub fn advertisements(&self) -> Vec<Frame> {
        self.frames()
            .into_iter()
            .filter(|frame| {
                frame.message().map_or(false, |message| {
                    matches!(message.body, ndisc::models::NdBody::Advert(_))
                })
            })
            .collect()
    }

    /// Frames that are not Neighbor Discovery messages.
    pub fn data(&self) -> Vec<Frame> {
        self.frames()
            .into_iter()
            .filter(|frame| frame.message().is_none())
            .collect()
    }

    pub fn unresolved(&self) -> Vec<(Ipv6Addr, Vec<HeldPacket>)> {
        self.unresolved.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
        self.unresolved.lock().unwrap().clear();
        self.events.lock().unwrap().clear();
    }

    fn event(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl LinkOutput for Recorder {
    fn transmit(&self, _ifp: &Interface, dst: LinkAddr, packet: &[u8]) -> Result<()> {
        self.frames.lock().unwrap().push(Frame {
            lladdr: dst,
            packet: packet.to_vec(),
        });
        Ok(())
    }

    fn unresolved(&self, _ifp: &Interface, dst: Ipv6Addr, packets: Vec<HeldPacket>) {
        self.unresolved.lock().unwrap().push((dst, packets));
    }
}

impl RouterList for Recorder {
    fn on_router_flag_cleared(&self, addr: Ipv6Addr, _ifp: &Interface) {
        self.event(Event::RouterFlagCleared(addr));
    }

    fn flush_routes(&self, addr: Ipv6Addr, _ifp: &Interface) {
        self.event(Event::FlushRoutes(addr));
    }

    fn on_router_removed(&self, addr: Ipv6Addr, _ifp: &Interface) {
        self.event(Event::RouterRemoved(addr));
    }
}

impl AddressEvents for Recorder {
    fn on_address_activated(&self, _ifp: &Interface, ia: &InterfaceAddress) {
        self.event(Event::Activated(ia.addr()));
    }

    fn on_address_duplicated(&self, _ifp: &Interface, ia: &InterfaceAddress) {
        self.event(Event::Duplicated(ia.addr()));
    }

    fn on_interface_disabled(&self, ifp: &Interface) {
        self.event(Event::Disabled(ifp.index()));
    }
}

/// A context with one Ethernet interface, without any address.
pub fn context(config: NdConfig) -> (NdContext, Arc<Interface>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let hooks = Hooks::new(recorder.clone())
        .with_routers(recorder.clone())
        .with_address_events(recorder.clone());
    let ctx = NdContext::with_seed(config.clone(), hooks, 42);
    let mut settings = config.interface_settings();
    settings.auto_linklocal = false;
    let ifp = ctx
        .attach(Interface::new(
            1,
            "eth0",
            LinkType::Ethernet,
            Some(local_mac()),
            settings,
        ))
        .unwrap();
    (ctx, ifp, recorder)
}

/// A context whose interface has `fe80::a/64` and `2001:db8::a/64`, both usable.
pub fn setup(config: NdConfig) -> (NdContext, Arc<Interface>, Arc<Recorder>) {
    let (ctx, ifp, recorder) = context(config);
    let nodad = AddressOptions {
        nodad: true,
        ..Default::default()
    };
    ctx.add_address(&ifp, addr("fe80::a"), 64, nodad).unwrap();
    ctx.add_address(&ifp, addr("2001:db8::a"), 64, nodad).unwrap();
    recorder.clear();
    (ctx, ifp, recorder)
}

/// An IPv6 packet (header only) from `src` to `dst`.
pub fn ipv6_packet(src: Ipv6Addr, dst: Ipv6Addr) -> HeldPacket {
    let mut buffer = vec![0u8; 40];
    let mut ip = MutableIpv6Packet::new(&mut buffer).unwrap();
    ip.set_version(6);
    ip.set_next_header(IpNextHeaderProtocols::Udp);
    ip.set_hop_limit(64);
    ip.set_source(src);
    ip.set_destination(dst);
    HeldPacket::new(buffer)
}

pub fn ns(src: Ipv6Addr, dst: Ipv6Addr, target: Ipv6Addr, slla: Option<LinkAddr>) -> Vec<u8> {
    Solicitation {
        src_addr: src,
        dst_addr: dst,
        target,
        source_lladdr: slla,
        nonce: None,
    }
    .encode()
}

/// A DAD probe for `target` from another node.
pub fn dad_probe(target: Ipv6Addr, nonce: Option<Nonce>) -> Vec<u8> {
    Solicitation {
        src_addr: Ipv6Addr::UNSPECIFIED,
        dst_addr: solicited_node(target),
        target,
        source_lladdr: None,
        nonce,
    }
    .encode()
}

pub fn na(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    target: Ipv6Addr,
    flags: AdvertFlags,
    tlla: Option<LinkAddr>,
) -> Vec<u8> {
    Advertisement {
        src_addr: src,
        dst_addr: dst,
        target,
        flags,
        target_lladdr: tlla,
    }
    .encode()
}

pub fn flags(router: bool, solicited: bool, override_: bool) -> AdvertFlags {
    AdvertFlags {
        router,
        solicited,
        override_,
    }
}
