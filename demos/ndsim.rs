//! Two hosts running Neighbor Discovery on a simulated Ethernet segment.
//!
//! Each host configures its addresses (DAD), then the first host sends
//! a packet to the second one (address resolution). With `--duplicate`,
//! both hosts claim the same global address and DAD detects it.
use std::collections::VecDeque;
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn, LevelFilter};
use ndisc::config::NdConfig;
use ndisc::hooks::{AddressEvents, Hooks, LinkOutput};
use ndisc::interface::{Interface, InterfaceAddress};
use ndisc::logger::StatisticsLogger;
use ndisc::models::{HeldPacket, LinkAddr, LinkType};
use ndisc::utilities::{configure_logger, parse_lladdr};
use ndisc::{AddressOptions, NdContext};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::MutableIpv6Packet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Minimum log level.
    #[arg(short = 'L', long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
    /// Number of DAD probes per address.
    #[arg(long, default_value_t = 1)]
    dad_count: u32,
    /// Both hosts configure the same global address.
    #[arg(long, default_value_t = false)]
    duplicate: bool,
    /// The segment reflects multicast frames back to their sender.
    #[arg(long, default_value_t = false)]
    loopback: bool,
    /// Simulated time, in seconds.
    #[arg(short = 'T', long, default_value_t = 10)]
    seconds: u64,
    /// Seed of the random delays and nonces.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

struct Frame {
    from: LinkAddr,
    dst: LinkAddr,
    packet: Vec<u8>,
}

/// A shared medium: frames wait here until the simulation delivers them.
struct Segment {
    frames: Mutex<VecDeque<Frame>>,
    /// Multicast frames are also delivered to their sender.
    loopback: bool,
}

impl LinkOutput for Segment {
    fn transmit(&self, ifp: &Interface, dst: LinkAddr, packet: &[u8]) -> Result<()> {
        self.frames.lock().unwrap().push_back(Frame {
            from: ifp.lladdr().unwrap_or(LinkAddr::EMPTY),
            dst,
            packet: packet.to_vec(),
        });
        Ok(())
    }

    fn unresolved(&self, ifp: &Interface, dst: Ipv6Addr, packets: Vec<HeldPacket>) {
        warn!("{}: {} packets to {} dropped", ifp.name(), packets.len(), dst);
    }
}

struct Console;

impl AddressEvents for Console {
    fn on_address_activated(&self, ifp: &Interface, addr: &InterfaceAddress) {
        info!("{}: {} ready", ifp.name(), addr);
    }

    fn on_address_duplicated(&self, ifp: &Interface, addr: &InterfaceAddress) {
        warn!("{}: {} is used by another host", ifp.name(), addr);
    }
}

struct Host {
    context: NdContext,
    interface: Arc<Interface>,
}

impl Host {
    fn new(
        name: &str,
        lladdr: &str,
        config: &NdConfig,
        segment: Arc<Segment>,
        seed: u64,
    ) -> Result<Self> {
        let hooks = Hooks::new(segment).with_address_events(Arc::new(Console));
        let context = NdContext::with_seed(config.clone(), hooks, seed);
        let interface = context.attach(Interface::new(
            1,
            name,
            LinkType::Ethernet,
            Some(parse_lladdr(lladdr)?),
            config.interface_settings(),
        ))?;
        Ok(Host { context, interface })
    }

    fn accepts(&self, frame: &Frame, loopback: bool) -> bool {
        let lladdr = self.interface.lladdr();
        if frame.dst.as_bytes().starts_with(&[0x33, 0x33]) {
            loopback || Some(frame.from) != lladdr
        } else {
            Some(frame.dst) == lladdr
        }
    }
}

/// Deliver every queued frame, including those sent in response.
fn pump(segment: &Segment, hosts: &[Host]) {
    loop {
        let frame = segment.frames.lock().unwrap().pop_front();
        let Some(frame) = frame else {
            break;
        };
        for host in hosts.iter().filter(|host| host.accepts(&frame, segment.loopback)) {
            host.context.input(&host.interface, &frame.packet);
        }
    }
}

/// An IPv6 packet without payload (next header 59).
fn datagram(src: Ipv6Addr, dst: Ipv6Addr) -> Vec<u8> {
    let mut buffer = vec![0u8; 40];
    if let Some(mut ip) = MutableIpv6Packet::new(&mut buffer) {
        ip.set_version(6);
        ip.set_next_header(IpNextHeaderProtocols::Ipv6NoNxt);
        ip.set_hop_limit(64);
        ip.set_source(src);
        ip.set_destination(dst);
    }
    buffer
}

fn run(segment: &Segment, hosts: &[Host], duration: Duration) {
    let step = Duration::from_millis(100);
    let mut elapsed = Duration::ZERO;
    while elapsed < duration {
        for host in hosts {
            host.context.advance(step);
        }
        pump(segment, hosts);
        elapsed += step;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    configure_logger(args.log_level);

    let config = NdConfig {
        dad_count: args.dad_count,
        ..Default::default()
    };
    info!("{}", config);

    let segment = Arc::new(Segment {
        frames: Mutex::new(VecDeque::new()),
        loopback: args.loopback,
    });
    let hosts = [
        Host::new("a0", "02:00:00:00:00:01", &config, segment.clone(), args.seed)?,
        Host::new("b0", "02:00:00:00:00:02", &config, segment.clone(), args.seed + 1)?,
    ];
    let logger = StatisticsLogger::new(
        hosts[0].context.statistics().clone(),
        Duration::from_secs(1),
    );

    let a: Ipv6Addr = "2001:db8::1".parse()?;
    let b: Ipv6Addr = if args.duplicate { a } else { "2001:db8::2".parse()? };
    hosts[0]
        .context
        .add_address(&hosts[0].interface, a, 64, AddressOptions::default())?;
    hosts[1]
        .context
        .add_address(&hosts[1].interface, b, 64, AddressOptions::default())?;
    run(&segment, &hosts, Duration::from_secs(3));

    for host in &hosts {
        for ia in host.interface.addresses() {
            info!("{}: {}", host.interface.name(), ia);
        }
    }

    if !args.duplicate {
        if let Err(error) = hosts[0]
            .context
            .output(&hosts[0].interface, b, datagram(a, b))
        {
            warn!("cannot send to {}: {}", b, error);
        }
        pump(&segment, &hosts);
    }
    run(&segment, &hosts, Duration::from_secs(args.seconds.saturating_sub(3)));

    for host in &hosts {
        for neighbor in host.context.neighbors(&host.interface) {
            info!("{}: {}", host.interface.name(), neighbor);
        }
        info!(
            "{}: {}",
            host.interface.name(),
            host.context.statistics().lock().unwrap()
        );
    }
    logger.stop();
    Ok(())
}
